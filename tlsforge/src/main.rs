use std::process::ExitCode;

use clap::{arg, crate_authors, crate_name, crate_version, value_parser, ArgMatches, Command};
use forge::error::Error;
use log::{error, info};
use serde::de::value::StrDeserializer;
use serde::de::IntoDeserializer;
use serde::Deserialize;
use tlsforge::config::ForgeConfig;
use tlsforge::oracle::conformity::DEFAULT_KEY_LENGTH;
use tlsforge::oracle::{OracleType, Pkcs1Oracle, PlaintextOracle, RsaPublicKey};
use tlsforge::tls::context::TlsContext;
use tlsforge::tls::enums::HandshakeType;
use tlsforge::tls::handshake::HandshakeMessage;

fn create_app() -> Command {
    Command::new(crate_name!())
        .version(crate_version!())
        .author(crate_authors!())
        .about("Prepares and parses TLS handshake messages with injected field modifications")
        .arg(arg!(-c --config [file] "TOML file with the connection parameters and injections"))
        .arg(arg!(-l --"log-file" [file] "Additionally write the log to this file"))
        .subcommand_required(true)
        .subcommands(vec![
            Command::new("prepare")
                .about("Prepares one handshake message and prints it as hex")
                .arg(arg!(<message> "The message kind, e.g. CertificateRequest")),
            Command::new("parse")
                .about("Parses a sequence of handshake messages given as hex")
                .arg(arg!(<input> "The hex encoded handshake messages")),
            Command::new("conformity")
                .about("Evaluates a plaintext block against a PKCS#1 padding oracle")
                .arg(arg!(<variant> "The oracle type, e.g. FFF or JSSE"))
                .arg(arg!(<block> "The hex encoded block"))
                .arg(
                    arg!(-k --"key-length" [n] "Expected length of the unpadded key")
                        .value_parser(value_parser!(usize)),
                ),
        ])
}

fn load_config(matches: &ArgMatches) -> Result<ForgeConfig, Error> {
    match matches.get_one::<String>("config") {
        Some(path) => ForgeConfig::from_file(path),
        None => Ok(ForgeConfig::default()),
    }
}

fn handshake_type(name: &str) -> Result<HandshakeType, Error> {
    let deserializer: StrDeserializer<serde::de::value::Error> = name.into_deserializer();
    HandshakeType::deserialize(deserializer)
        .map_err(|_| Error::Config(format!("unknown handshake message {}", name)))
}

fn prepare(config: &ForgeConfig, name: &str) -> Result<String, Error> {
    let mut ctx = TlsContext::from_config(config)?;
    let mut message = HandshakeMessage::for_context(handshake_type(name)?, &ctx)?;
    let injected = config.apply_injections(&mut message)?;
    info!("Preparing {:?} with {} injected fields", message.typ(), injected);
    let bytes = message.prepare(&mut ctx)?;
    Ok(hex::encode(bytes))
}

fn parse(config: &ForgeConfig, input: &str) -> Result<usize, Error> {
    let mut ctx = TlsContext::from_config(config)?;
    let bytes = hex::decode(input.trim())?;
    let mut pointer = 0;
    let mut count = 0;
    while pointer < bytes.len() {
        let (message, next) = HandshakeMessage::read_next(&mut ctx, &bytes, pointer)?;
        info!(
            "{:?} at {}..{}: {}",
            message.typ(),
            pointer,
            next,
            hex::encode(&bytes[pointer..next])
        );
        pointer = next;
        count += 1;
    }
    Ok(count)
}

fn conformity(variant: &str, block: &str, key_length: usize) -> Result<(bool, u64), Error> {
    let oracle_type: OracleType = variant.parse()?;
    let block = hex::decode(block.trim())?;
    let public_key = RsaPublicKey::new(vec![0xff; block.len()], vec![0x01, 0x00, 0x01]);
    let oracle = PlaintextOracle::new(oracle_type, public_key).with_key_length(key_length);
    let verdict = oracle.check_pkcs_conformity(&block)?;
    Ok((verdict, oracle.number_of_queries()))
}

fn run(matches: &ArgMatches) -> Result<(), Error> {
    let config = load_config(matches)?;

    match matches.subcommand() {
        Some(("prepare", matches)) => {
            let name = matches
                .get_one::<String>("message")
                .ok_or_else(|| Error::Config("missing message kind".to_string()))?;
            println!("{}", prepare(&config, name)?);
        }
        Some(("parse", matches)) => {
            let input = matches
                .get_one::<String>("input")
                .ok_or_else(|| Error::Config("missing input".to_string()))?;
            let count = parse(&config, input)?;
            info!("Parsed {} messages", count);
        }
        Some(("conformity", matches)) => {
            let variant = matches
                .get_one::<String>("variant")
                .ok_or_else(|| Error::Config("missing oracle type".to_string()))?;
            let block = matches
                .get_one::<String>("block")
                .ok_or_else(|| Error::Config("missing block".to_string()))?;
            let key_length = *matches
                .get_one::<usize>("key-length")
                .unwrap_or(&DEFAULT_KEY_LENGTH);
            let (verdict, queries) = conformity(variant, block, key_length)?;
            println!("{} ({} queries)", verdict, queries);
        }
        _ => return Err(Error::Config("no subcommand given".to_string())),
    }
    Ok(())
}

fn log_config(matches: &ArgMatches) -> Result<log4rs::Config, Error> {
    match matches.get_one::<String>("log-file") {
        Some(path) => forge::log::config_file(path),
        None => forge::log::config_default(),
    }
}

pub fn main() -> ExitCode {
    let matches = create_app().get_matches();

    let config = match log_config(&matches) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("Failed to configure logging: {}", err);
            return ExitCode::FAILURE;
        }
    };
    if let Err(err) = log4rs::init_config(config) {
        eprintln!("Failed to init logging: {:?}", err);
        return ExitCode::FAILURE;
    }

    match run(&matches) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{}", err);
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test_log::test]
    fn log_file_option() {
        let path = std::env::temp_dir().join("tlsforge-cli-log-file-option.log");
        let path = path.to_string_lossy().to_string();
        let matches =
            create_app().get_matches_from(["tlsforge", "--log-file", &path, "parse", "0e000000"]);
        assert!(log_config(&matches).is_ok());
        assert!(std::path::Path::new(&path).exists());

        let matches = create_app().get_matches_from(["tlsforge", "parse", "0e000000"]);
        assert!(log_config(&matches).is_ok());
    }

    #[test_log::test]
    fn handshake_type_names() {
        assert_eq!(
            handshake_type("CertificateRequest").unwrap(),
            HandshakeType::CertificateRequest
        );
        assert!(matches!(handshake_type("Hello"), Err(Error::Config(_))));
    }

    #[test_log::test]
    fn prepare_and_parse_round_trip() {
        let config = ForgeConfig::default();
        let encoded = prepare(&config, "ServerHelloDone").unwrap();
        assert_eq!(encoded, "0e000000");

        let mut server = ForgeConfig::default();
        server.connection_end = tlsforge::tls::enums::ConnectionEnd::Server;
        let certificate_request = prepare(&server, "CertificateRequest").unwrap();
        let input = format!("{}{}", certificate_request, encoded);
        assert_eq!(parse(&config, &input).unwrap(), 2);
    }

    #[test_log::test]
    fn conformity_verdict() {
        let mut block = vec![0x00, 0x02];
        block.resize(128 - DEFAULT_KEY_LENGTH - 1, 0x11);
        block.push(0x00);
        block.resize(128, 0x22);
        let block = hex::encode(block);

        assert_eq!(conformity("FFF", &block, DEFAULT_KEY_LENGTH).unwrap(), (true, 1));
        assert_eq!(conformity("FFF", &block, 20).unwrap(), (false, 1));
        assert!(matches!(
            conformity("FFX", &block, DEFAULT_KEY_LENGTH),
            Err(Error::Config(_))
        ));
    }
}
