use std::env;
use std::path::Path;
use std::str::FromStr;

use log::LevelFilter;
use log4rs::append::console::ConsoleAppender;
use log4rs::append::file::FileAppender;
use log4rs::config::{Appender, Root};
use log4rs::encode::pattern::PatternEncoder;
use log4rs::Config;

use crate::error::Error;

/// Log to stderr at the level given by `RUST_LOG` (default: info)
pub fn config_default() -> Result<Config, Error> {
    Config::builder()
        .appender(appender_stderr("stderr"))
        .build(Root::builder().appender("stderr").build(log_level()))
        .map_err(|err| Error::Config(format!("invalid log configuration: {}", err)))
}

/// Log to stderr and additionally write every record to `path`
pub fn config_file<P>(path: P) -> Result<Config, Error>
where
    P: AsRef<Path>,
{
    Config::builder()
        .appender(appender_stderr("stderr"))
        .appender(appender_tofile("tofile", path)?)
        .build(
            Root::builder()
                .appender("stderr")
                .appender("tofile")
                .build(log_level()),
        )
        .map_err(|err| Error::Config(format!("invalid log configuration: {}", err)))
}

fn appender_stderr<S>(name: S) -> Appender
where
    S: AsRef<str>,
{
    Appender::builder().build(
        name.as_ref(),
        Box::new(
            ConsoleAppender::builder()
                .target(log4rs::append::console::Target::Stderr)
                .encoder(Box::new(PatternEncoder::new(
                    "{h({d(%Y-%m-%dT%H:%M:%S%Z)}\t{m}{n})}",
                )))
                .build(),
        ),
    )
}

fn appender_tofile<S, P>(name: S, log_path: P) -> Result<Appender, Error>
where
    S: AsRef<str>,
    P: AsRef<Path>,
{
    let file = FileAppender::builder()
        .encoder(Box::new(PatternEncoder::new("{d}\t{l}\t{m}{n}")))
        .build(log_path)?;
    Ok(Appender::builder().build(name.as_ref(), Box::new(file)))
}

fn log_level() -> LevelFilter {
    env::var("RUST_LOG")
        .ok()
        .and_then(|level| LevelFilter::from_str(&level).ok())
        .unwrap_or(LevelFilter::Info)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test_log::test]
    fn file_appender_creates_log_file() {
        let path = env::temp_dir().join("forge-file-appender-creates-log-file.log");
        assert!(config_default().is_ok());
        let config = config_file(&path).unwrap();
        assert_eq!(config.appenders().len(), 2);
        assert!(path.exists());
    }
}
