use clap::Parser;

/// Process-wide tunables, parsed the way `influxdb_iox`'s `clap_blocks`
/// parses its binaries' options. The SQL-exposed `SET probing.<knob>`
/// surface is independent of this: these are the knobs a host
/// process or example harness sets once at startup, not the ones a client
/// can change over the REPL/SQL connection.
#[derive(Debug, Parser, Clone)]
pub struct AgentConfig {
    /// Socket bind address: `unix:<id>` for an abstract-namespace UNIX
    /// socket, or `host:port` for TCP.
    #[clap(long, env = "PROBING_BIND", default_value = "unix:default")]
    pub bind: String,

    /// Default chunk size for tables created without an explicit config.
    #[clap(long, env = "PROBING_CHUNK_SIZE", default_value = "1024")]
    pub default_chunk_size: usize,

    /// Log level passed through to `probing-observability-deps`'s
    /// `EnvFilter`.
    #[clap(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            bind: "unix:default".to_string(),
            default_chunk_size: 1024,
            log_level: "info".to_string(),
        }
    }
}
