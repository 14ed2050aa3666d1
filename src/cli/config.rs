//! Config file application

use templated_mcp::config::Config;

use super::Cli;

/// Fill unset CLI options from the config file.
/// CLI flags and environment variables always override config values.
pub(super) fn apply_config_defaults(cli: &mut Cli, config: Config) {
    let from_cli = Config {
        api_key: cli.api_key.take(),
        folder_id: cli.folder_id.take(),
        external_id: cli.external_id.take(),
        port: cli.port.take(),
        bind: cli.bind.take(),
        api_base: cli.api_base.take(),
        oauth_issuer: cli.oauth_issuer.take(),
        challenge_token: cli.challenge_token.take(),
    };
    let merged = config.override_with(from_cli);

    cli.api_key = merged.api_key;
    cli.folder_id = merged.folder_id;
    cli.external_id = merged.external_id;
    cli.port = merged.port;
    cli.bind = merged.bind;
    cli.api_base = merged.api_base;
    cli.oauth_issuer = merged.oauth_issuer;
    cli.challenge_token = merged.challenge_token;
}
