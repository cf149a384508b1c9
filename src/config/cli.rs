//! Command line interface.

use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug, Clone, Default)]
#[command(name = "static-gate")]
#[command(about = "Serve a static website behind authentication", long_about = None)]
#[command(disable_version_flag = true)]
pub struct Cli {
    /// Root folder of the static website to serve
    #[arg(short = 'r', long = "site-root", required_unless_present_any = ["version", "config"])]
    pub site_root: Option<PathBuf>,

    /// Web server port to listen on [default: 8080]
    #[arg(short, long)]
    pub port: Option<u16>,

    /// TOML configuration file (timeouts, auth, logging)
    #[arg(short, long, env = "STATIC_GATE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Show version info and exit
    #[arg(short = 'v', long = "version")]
    pub version: bool,
}

/// Version, copyright, license, source and contact lines printed by `--version`.
pub fn version_banner() -> String {
    let contact = env!("CARGO_PKG_AUTHORS").replace(':', ", ");
    let holder = contact.split(" <").next().unwrap_or_default();
    format!(
        "{name} {version}\n\
         {description}\n\
         Copyright (c) {holder}\n\
         License: {license} <https://opensource.org/licenses/MIT>\n\
         Source code <{repository}>\n\
         Contact: {contact}\n",
        name = env!("CARGO_PKG_NAME"),
        version = env!("CARGO_PKG_VERSION"),
        description = env!("CARGO_PKG_DESCRIPTION"),
        license = env!("CARGO_PKG_LICENSE"),
        repository = env!("CARGO_PKG_REPOSITORY"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_flag_needs_no_site_root() {
        let cli = Cli::try_parse_from(["static-gate", "-v"]).unwrap();
        assert!(cli.version);
        assert!(cli.site_root.is_none());
    }

    #[test]
    fn site_root_is_required() {
        assert!(Cli::try_parse_from(["static-gate", "--port", "9000"]).is_err());
    }

    #[test]
    fn short_and_long_flags() {
        let cli = Cli::try_parse_from(["static-gate", "-r", "/site", "-p", "9000"]).unwrap();
        assert_eq!(cli.site_root, Some(PathBuf::from("/site")));
        assert_eq!(cli.port, Some(9000));

        let cli = Cli::try_parse_from(["static-gate", "--site-root", "/site"]).unwrap();
        assert_eq!(cli.port, None);
        assert!(!cli.version);
    }

    #[test]
    fn port_must_fit_u16() {
        assert!(Cli::try_parse_from(["static-gate", "-r", "/site", "-p", "70000"]).is_err());
    }

    #[test]
    fn banner_names_the_package() {
        let banner = version_banner();
        assert!(banner.starts_with(env!("CARGO_PKG_NAME")));
        assert!(banner.contains(env!("CARGO_PKG_VERSION")));
        assert!(banner.contains("MIT"));
        assert!(banner.contains("Copyright (c) The static-gate developers\n"));
        assert!(banner.contains(&format!("Source code <{}>", env!("CARGO_PKG_REPOSITORY"))));
        assert!(banner.contains("Contact: "));
        assert_eq!(banner.lines().count(), 6);
    }
}
