//! Node configuration for the mining runtime.

use hexa_core::algo::Algo;
use hexa_core::constants::DEFAULT_RPC_BACK_COMPATIBLE;

/// Default TCP port for the JSON-RPC server.
pub const DEFAULT_RPC_PORT: u16 = 18555;

/// Configuration for the mining RPC runtime.
#[derive(Debug, Clone)]
pub struct NodeConfig {
    /// IP address for the JSON-RPC server to bind to.
    pub rpc_bind: String,
    /// Port for the JSON-RPC server.
    pub rpc_port: u16,
    /// Algorithm used when an RPC call does not name one.
    pub mining_algo: Algo,
    /// Accept `getblocktemplate` without a template request and
    /// auto-insert the segwit rule for old clients.
    pub rpc_backcompatible: bool,
    /// Log level filter string (e.g. "info", "hexa_node=debug").
    pub log_level: String,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            rpc_bind: "127.0.0.1".to_string(),
            rpc_port: DEFAULT_RPC_PORT,
            mining_algo: Algo::X16r,
            rpc_backcompatible: DEFAULT_RPC_BACK_COMPATIBLE,
            log_level: "info".to_string(),
        }
    }
}

impl NodeConfig {
    /// Socket address string for the RPC server.
    pub fn rpc_addr(&self) -> String {
        format!("{}:{}", self.rpc_bind, self.rpc_port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_rpc_port() {
        assert_eq!(NodeConfig::default().rpc_port, DEFAULT_RPC_PORT);
    }

    #[test]
    fn default_bind_is_localhost() {
        assert_eq!(NodeConfig::default().rpc_bind, "127.0.0.1");
    }

    #[test]
    fn default_back_compatibility_follows_constant() {
        assert_eq!(
            NodeConfig::default().rpc_backcompatible,
            DEFAULT_RPC_BACK_COMPATIBLE
        );
    }

    #[test]
    fn rpc_addr_format() {
        let cfg = NodeConfig {
            rpc_bind: "0.0.0.0".to_string(),
            rpc_port: 9999,
            ..NodeConfig::default()
        };
        assert_eq!(cfg.rpc_addr(), "0.0.0.0:9999");
    }
}
