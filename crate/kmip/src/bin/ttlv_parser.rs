use std::io::{Write, stdin, stdout};

use kmip_proto::{
    kmip_attributes::AttributePolicy,
    kmip_messages::{RequestMessage, ResponseMessage},
    kmip_types::{Tag, enumeration_name},
    ttlv::{DecodeOptions, FromTtlv, TTLV, TTLValue},
};

/// Fill in the names of the enumerations the tag registry knows
fn name_enumerations(ttlv: &mut TTLV) {
    match &mut ttlv.value {
        TTLValue::Structure(items) => items.iter_mut().for_each(name_enumerations),
        TTLValue::Enumeration(variant) if variant.name.is_empty() => {
            if let Some(name) = ttlv
                .tag
                .parse::<Tag>()
                .ok()
                .and_then(|tag| enumeration_name(tag, variant.value))
            {
                variant.name = name;
            }
        }
        _ => {}
    }
}

/// A simple command-line parser for TTLV messages.
/// It reads hex strings from the user, decodes them leniently, prints the
/// TTLV tree as JSON, then tries to read it as a KMIP 1.x request or response.
/// The parser continues until the user types "quit" or "exit".
fn main() {
    println!("TTLV Parser - Enter hex strings (or 'quit' to exit)");
    loop {
        print!("> ");
        if stdout().flush().is_err() {
            break;
        }

        let mut input = String::new();
        match stdin().read_line(&mut input) {
            Ok(0) => break,
            Ok(_) => {}
            Err(_) => {
                println!("Error reading input");
                continue;
            }
        }

        let input = input.trim();
        if input.is_empty() {
            continue;
        }

        if input == "quit" || input == "exit" {
            break;
        }

        let bytes = match hex::decode(input) {
            Ok(bytes) => bytes,
            Err(e) => {
                println!("ERROR parsing hex string: {e}");
                continue;
            }
        };
        match TTLV::find_version(&bytes) {
            Ok((1, minor)) => println!("KMIP 1.{minor}"),
            Ok((major, minor)) => println!("WARNING: unsupported KMIP version: {major}.{minor}"),
            Err(_) => println!("WARNING: no KMIP version found"),
        }
        let mut ttlv = match TTLV::from_bytes_with(&bytes, DecodeOptions::lenient()) {
            Ok((ttlv, remaining)) => {
                if !remaining.is_empty() {
                    println!("WARNING: {} trailing bytes ignored", remaining.len());
                }
                ttlv
            }
            Err(e) => {
                println!("ERROR parsing TTLV: {e}");
                continue;
            }
        };
        name_enumerations(&mut ttlv);
        match serde_json::to_string_pretty(&ttlv) {
            Ok(json) => println!("\nTTLV ==> \n\n{json}\n"),
            Err(e) => println!("ERROR rendering TTLV: {e}"),
        }

        if ttlv.tag == Tag::RequestMessage.to_string() {
            match RequestMessage::from_ttlv_with(&ttlv, AttributePolicy::Passthrough) {
                Err(r) => println!("ERROR converting TTLV to RequestMessage: {r}"),
                Ok(request) => println!("Request ==>\n\n{request:#?}"),
            }
        } else if ttlv.tag == Tag::ResponseMessage.to_string() {
            match ResponseMessage::from_ttlv(&ttlv) {
                Err(r) => println!("ERROR converting TTLV to ResponseMessage: {r}"),
                Ok(response) => println!("Response ==>\n\n{response:#?}"),
            }
        } else {
            println!("ERROR: unknown message type");
        }
    }
}
