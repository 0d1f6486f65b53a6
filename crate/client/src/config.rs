use std::{
    env,
    fs::{self, File},
    io::BufReader,
    path::{Path, PathBuf},
};

use ini::Ini;
use kmip_proto::{kmip_attributes::AttributePolicy, kmip_types::ProtocolVersion};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{
    ClientError,
    error::result::{ClientResult, ClientResultHelper},
};

/// Environment variable holding the path of the JSON configuration file.
pub const KMIP_CONF_ENV: &str = "KMIP_CONF";

/// Returns the path to the current user's home folder.
///
/// Returns `None` if the home folder cannot be determined.
fn get_home_folder() -> Option<PathBuf> {
    if let Some(home) = env::var_os("HOME") {
        return Some(PathBuf::from(home))
    } else if let Some(profile) = env::var_os("USERPROFILE") {
        return Some(PathBuf::from(profile))
    } else if let (Some(hdrive), Some(hpath)) = (env::var_os("HOMEDRIVE"), env::var_os("HOMEPATH"))
    {
        return Some(PathBuf::from(hdrive).join(hpath))
    }
    None
}

fn get_default_conf_path() -> ClientResult<PathBuf> {
    get_home_folder()
        .ok_or_else(|| ClientError::Configuration("unable to determine the home folder".to_owned()))
        .map(|home| home.join(".kmip/kmip.json"))
}

/// used for serialization
const fn not(b: &bool) -> bool {
    !*b
}

const fn default_port() -> u16 {
    5696
}

fn default_kmip_version() -> String {
    "1.4".to_owned()
}

const fn default_timeout_seconds() -> u64 {
    30
}

#[derive(Serialize, Deserialize, Eq, PartialEq, Debug, Clone)]
pub struct KmipClientConfig {
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// `major.minor`, KMIP 1.x only
    #[serde(default = "default_kmip_version")]
    pub kmip_version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ssl_client_pkcs12_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ssl_client_pkcs12_password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ssl_client_cert_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ssl_client_key_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server_ca_cert_path: Option<String>,
    // useful against test servers running a self-signed certificate
    #[serde(default)]
    #[serde(skip_serializing_if = "not")]
    pub accept_invalid_certs: bool,
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub maximum_response_size: Option<i32>,
    /// Accept attribute names missing from the registry
    #[serde(default)]
    #[serde(skip_serializing_if = "not")]
    pub attribute_passthrough: bool,
}

impl Default for KmipClientConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_owned(),
            port: default_port(),
            kmip_version: default_kmip_version(),
            username: None,
            password: None,
            ssl_client_pkcs12_path: None,
            ssl_client_pkcs12_password: None,
            ssl_client_cert_path: None,
            ssl_client_key_path: None,
            server_ca_cert_path: None,
            accept_invalid_certs: false,
            timeout_seconds: default_timeout_seconds(),
            maximum_response_size: None,
            attribute_passthrough: false,
        }
    }
}

impl KmipClientConfig {
    /// Resolve the JSON configuration path from, in order: the explicit
    /// argument, the `KMIP_CONF` environment variable, `~/.kmip/kmip.json`.
    pub fn location(conf: Option<PathBuf>) -> ClientResult<PathBuf> {
        if let Some(conf_path) = conf {
            if !conf_path.exists() {
                return Err(ClientError::Configuration(format!(
                    "configuration file {conf_path:?} does not exist"
                )))
            }
            return Ok(conf_path)
        } else if let Ok(conf_path) = env::var(KMIP_CONF_ENV).map(PathBuf::from) {
            if !conf_path.exists() {
                return Err(ClientError::Configuration(format!(
                    "configuration file {conf_path:?} specified in {KMIP_CONF_ENV} environment \
                     variable does not exist"
                )))
            }
            return Ok(conf_path)
        }
        let user_conf = get_default_conf_path()?;
        if !user_conf.exists() {
            info!("configuration path is at: {user_conf:?} and will be initialized with a default value");
        }
        Ok(user_conf)
    }

    pub fn save(&self, conf_path: &Path) -> ClientResult<()> {
        fs::write(
            conf_path,
            serde_json::to_string_pretty(&self)
                .with_context(|| format!("unable to serialize configuration {self:?}"))?,
        )
        .with_context(|| format!("unable to write configuration to file {conf_path:?}"))?;
        Ok(())
    }

    /// Load the configuration, writing a default one if the file is missing.
    pub fn load(conf_path: &Path) -> ClientResult<Self> {
        if conf_path.exists() {
            let file = File::open(conf_path)
                .with_context(|| format!("unable to read configuration file {conf_path:?}"))?;
            return serde_json::from_reader(BufReader::new(file)).map_err(|e| {
                ClientError::Configuration(format!(
                    "error while parsing configuration file {conf_path:?}: {e}"
                ))
            })
        }
        let parent = conf_path
            .parent()
            .with_context(|| format!("unable to get parent directory of {conf_path:?}"))?;
        fs::create_dir_all(parent)
            .with_context(|| format!("unable to create directory {parent:?}"))?;
        let default_conf = Self::default();
        default_conf.save(conf_path)?;
        Ok(default_conf)
    }

    /// Read a section of an INI client configuration file, such as:
    ///
    /// ```ini
    /// [client]
    /// host=127.0.0.1
    /// port=5696
    /// certfile=/path/to/client.crt
    /// keyfile=/path/to/client.key
    /// ca_certs=/path/to/ca.crt
    /// ```
    pub fn from_ini(path: &Path, section: &str) -> ClientResult<Self> {
        let ini = Ini::load_from_file(path).map_err(|e| {
            ClientError::Configuration(format!("unable to read INI file {path:?}: {e}"))
        })?;
        let properties = ini.section(Some(section)).ok_or_else(|| {
            ClientError::Configuration(format!("no section [{section}] in {path:?}"))
        })?;
        let get = |key: &str| properties.get(key).map(str::trim).map(ToOwned::to_owned);

        let mut conf = Self::default();
        if let Some(host) = get("host") {
            conf.host = host;
        }
        if let Some(port) = get("port") {
            conf.port = port.parse().map_err(|e| {
                ClientError::Configuration(format!("invalid port {port:?} in [{section}]: {e}"))
            })?;
        }
        if let Some(version) = get("kmip_version") {
            conf.kmip_version = version;
        }
        if let Some(timeout) = get("timeout") {
            conf.timeout_seconds = timeout.parse().map_err(|e| {
                ClientError::Configuration(format!(
                    "invalid timeout {timeout:?} in [{section}]: {e}"
                ))
            })?;
        }
        conf.ssl_client_cert_path = get("certfile");
        conf.ssl_client_key_path = get("keyfile");
        conf.server_ca_cert_path = get("ca_certs");
        conf.username = get("username");
        conf.password = get("password");
        // the server is verified unless cert_reqs says otherwise
        conf.accept_invalid_certs = get("cert_reqs").as_deref() == Some("CERT_NONE");
        conf.protocol_version()?;
        Ok(conf)
    }

    /// The configured protocol version, restricted to KMIP 1.0 to 1.4.
    pub fn protocol_version(&self) -> ClientResult<ProtocolVersion> {
        let invalid = || {
            ClientError::Configuration(format!(
                "unsupported KMIP version {:?}: expected 1.0 to 1.4",
                self.kmip_version
            ))
        };
        let (major, minor) = self.kmip_version.split_once('.').ok_or_else(invalid)?;
        let major: i32 = major.trim().parse().map_err(|_e| invalid())?;
        let minor: i32 = minor.trim().parse().map_err(|_e| invalid())?;
        if major != 1 || !(0..=4).contains(&minor) {
            return Err(invalid())
        }
        Ok(ProtocolVersion::new(major, minor))
    }

    pub const fn attribute_policy(&self) -> AttributePolicy {
        if self.attribute_passthrough {
            AttributePolicy::Passthrough
        } else {
            AttributePolicy::Strict
        }
    }
}

#[allow(clippy::unwrap_used)]
#[cfg(test)]
mod tests {
    use std::fs;

    use kmip_proto::kmip_types::ProtocolVersion;

    use super::KmipClientConfig;
    use crate::ClientError;

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("conf/kmip.json");

        // missing file is created with defaults
        let conf = KmipClientConfig::load(&path).unwrap();
        assert_eq!(conf, KmipClientConfig::default());
        assert!(path.exists());

        let conf = KmipClientConfig {
            host: "kmip.example.com".to_owned(),
            username: Some("alice".to_owned()),
            kmip_version: "1.2".to_owned(),
            ..KmipClientConfig::default()
        };
        conf.save(&path).unwrap();
        let loaded = KmipClientConfig::load(&path).unwrap();
        assert_eq!(loaded, conf);
        assert_eq!(loaded.protocol_version().unwrap(), ProtocolVersion::KMIP_1_2);
    }

    #[test]
    fn test_partial_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("kmip.json");
        fs::write(&path, r#"{"host": "10.0.0.1"}"#).unwrap();
        let conf = KmipClientConfig::load(&path).unwrap();
        assert_eq!(conf.host, "10.0.0.1");
        assert_eq!(conf.port, 5696);
        assert_eq!(conf.timeout_seconds, 30);
        assert_eq!(conf.protocol_version().unwrap(), ProtocolVersion::KMIP_1_4);

        fs::write(&path, r#"{"port": 5696}"#).unwrap();
        let e = KmipClientConfig::load(&path).unwrap_err().to_string();
        assert!(e.contains("missing field `host`"), "{e}");
    }

    #[test]
    fn test_from_ini_section() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("kmip.conf");
        fs::write(
            &path,
            "[test]\nhost=192.168.1.20\nport=5697\ncertfile=/etc/kmip/client.crt\n\
             keyfile=/etc/kmip/client.key\nca_certs=/etc/kmip/ca.crt\n\
             cert_reqs=CERT_REQUIRED\nusername=bob\n",
        )
        .unwrap();
        let conf = KmipClientConfig::from_ini(&path, "test").unwrap();
        assert_eq!(conf.host, "192.168.1.20");
        assert_eq!(conf.port, 5697);
        assert_eq!(conf.ssl_client_cert_path.as_deref(), Some("/etc/kmip/client.crt"));
        assert_eq!(conf.ssl_client_key_path.as_deref(), Some("/etc/kmip/client.key"));
        assert_eq!(conf.server_ca_cert_path.as_deref(), Some("/etc/kmip/ca.crt"));
        assert_eq!(conf.username.as_deref(), Some("bob"));
        assert!(!conf.accept_invalid_certs);

        let err = KmipClientConfig::from_ini(&path, "prod").unwrap_err();
        assert!(matches!(err, ClientError::Configuration(_)));
    }

    #[test]
    fn test_protocol_version_is_1_x_only() {
        for (version, ok) in [("1.0", true), ("1.4", true), ("1.5", false), ("2.1", false), ("1", false)]
        {
            let conf = KmipClientConfig {
                kmip_version: version.to_owned(),
                ..KmipClientConfig::default()
            };
            assert_eq!(conf.protocol_version().is_ok(), ok, "{version}");
        }
    }
}
