use std::{path::PathBuf, process};

use clap::{Parser, Subcommand};
use kmip_client::{
    ClientError, KmipClient, KmipClientConfig, SocketTransport,
    kmip_proto::{
        kmip_data_structures::CryptographicParameters,
        kmip_types::{BlockCipherMode, CryptographicAlgorithm, CryptographicUsageMask, PaddingMethod},
    },
};
use thiserror::Error;
use tracing::info;

#[derive(Error, Debug)]
enum DemoError {
    #[error(transparent)]
    Client(#[from] ClientError),
    #[error("invalid hex in {0}: {1}")]
    Hex(&'static str, hex::FromHexError),
    #[error("the decrypted message is not UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

/// Drive a KMIP 1.x server: create, activate and use an AES key.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Section of the INI configuration file to use
    #[arg(short, long, global = true, requires = "ini")]
    config: Option<String>,

    /// INI configuration file holding the `--config` section
    #[arg(long, global = true, env = "KMIP_INI")]
    ini: Option<PathBuf>,

    /// JSON configuration file, used when no INI section is given
    #[arg(long, global = true)]
    conf_path: Option<PathBuf>,

    #[command(subcommand)]
    command: DemoCommands,
}

#[derive(Subcommand)]
enum DemoCommands {
    /// Create and activate an AES-128 key, then encrypt a message with it
    Encrypt {
        #[arg(short, long)]
        message: String,

        #[arg(long, default_value = "CBC")]
        mode: BlockCipherMode,

        #[arg(long, default_value = "ANSI_X923")]
        padding: PaddingMethod,

        /// Hex IV; without it the server generates one
        #[arg(long)]
        iv: Option<String>,
    },
    /// Decrypt a hex ciphertext with an existing key
    Decrypt {
        #[arg(short = 'i', long)]
        uid: String,

        /// Hex ciphertext
        #[arg(short, long)]
        message: String,

        #[arg(long, default_value = "CBC")]
        mode: BlockCipherMode,

        #[arg(long, default_value = "ANSI_X923")]
        padding: PaddingMethod,

        /// Hex IV used at encryption
        #[arg(long)]
        iv: Option<String>,
    },
}

fn main() {
    if let Some(err) = main_().err() {
        eprintln!("ERROR: {err}");
        process::exit(1);
    }
}

fn main_() -> Result<(), DemoError> {
    kmip_logger::log_init(None);
    let opts = Cli::parse();

    let conf = match (&opts.ini, &opts.config) {
        (Some(ini), Some(section)) => KmipClientConfig::from_ini(ini, section)?,
        _ => KmipClientConfig::load(&KmipClientConfig::location(opts.conf_path.clone())?)?,
    };
    let mut client = KmipClient::<SocketTransport>::from_config(&conf)?;

    match opts.command {
        DemoCommands::Encrypt {
            message,
            mode,
            padding,
            iv,
        } => {
            let iv = iv.map(|iv| decode_hex("--iv", &iv)).transpose()?;
            let uid = client.create(
                CryptographicAlgorithm::AES,
                128,
                CryptographicUsageMask::Encrypt | CryptographicUsageMask::Decrypt,
            )?;
            info!("Successfully created a new encryption key.");
            info!("Secret ID: {uid}");

            client.activate(&uid)?;
            info!("Successfully activated the encryption key.");

            let result = client.encrypt(
                &uid,
                message.as_bytes(),
                &parameters(mode, padding),
                iv.as_deref(),
            )?;
            info!("Successfully encrypted the message.");
            info!("Cipher text: {}", hex::encode(&result.ciphertext));
            match result.generated_iv {
                Some(generated) => info!("Autogenerated IV: {}", hex::encode(generated)),
                None => info!("No autogenerated IV expected, since one was provided."),
            }
            if let Some(tag) = result.authenticated_encryption_tag {
                info!("Authentication tag: {}", hex::encode(tag));
            }
        }
        DemoCommands::Decrypt {
            uid,
            message,
            mode,
            padding,
            iv,
        } => {
            let ciphertext = decode_hex("--message", &message)?;
            let iv = iv.map(|iv| decode_hex("--iv", &iv)).transpose()?;
            let plaintext =
                client.decrypt(&uid, &ciphertext, &parameters(mode, padding), iv.as_deref())?;
            info!("Successfully decrypted the message.");
            info!("Plain text: {:?}", String::from_utf8(plaintext.to_vec())?);
        }
    }

    client.close();
    Ok(())
}

fn parameters(mode: BlockCipherMode, padding: PaddingMethod) -> CryptographicParameters {
    CryptographicParameters {
        cryptographic_algorithm: Some(CryptographicAlgorithm::AES),
        block_cipher_mode: Some(mode),
        padding_method: Some(padding),
        ..CryptographicParameters::default()
    }
}

fn decode_hex(argument: &'static str, value: &str) -> Result<Vec<u8>, DemoError> {
    hex::decode(value.trim()).map_err(|e| DemoError::Hex(argument, e))
}
