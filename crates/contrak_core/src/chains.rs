//! Chain-id to name and block-explorer lookup.

/// Display metadata for a single EVM network.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChainInfo {
    pub chain_id: u64,
    pub name: &'static str,
    pub explorer_url: Option<&'static str>,
}

const UNKNOWN_CHAIN: &str = "Unknown chain";

static CHAINS: &[ChainInfo] = &[
    ChainInfo {
        chain_id: 1,
        name: "Ethereum Mainnet",
        explorer_url: Some("https://etherscan.io"),
    },
    ChainInfo {
        chain_id: 5,
        name: "Goerli",
        explorer_url: Some("https://goerli.etherscan.io"),
    },
    ChainInfo {
        chain_id: 10,
        name: "Optimism",
        explorer_url: Some("https://optimistic.etherscan.io"),
    },
    ChainInfo {
        chain_id: 56,
        name: "BNB Smart Chain",
        explorer_url: Some("https://bscscan.com"),
    },
    ChainInfo {
        chain_id: 137,
        name: "Polygon",
        explorer_url: Some("https://polygonscan.com"),
    },
    ChainInfo {
        chain_id: 1337,
        name: "Localhost",
        explorer_url: None,
    },
    ChainInfo {
        chain_id: 8453,
        name: "Base",
        explorer_url: Some("https://basescan.org"),
    },
    ChainInfo {
        chain_id: 31337,
        name: "Hardhat",
        explorer_url: None,
    },
    ChainInfo {
        chain_id: 42161,
        name: "Arbitrum One",
        explorer_url: Some("https://arbiscan.io"),
    },
    ChainInfo {
        chain_id: 43114,
        name: "Avalanche C-Chain",
        explorer_url: Some("https://snowtrace.io"),
    },
    ChainInfo {
        chain_id: 80001,
        name: "Polygon Mumbai",
        explorer_url: Some("https://mumbai.polygonscan.com"),
    },
    ChainInfo {
        chain_id: 84532,
        name: "Base Sepolia",
        explorer_url: Some("https://sepolia.basescan.org"),
    },
    ChainInfo {
        chain_id: 11155111,
        name: "Sepolia",
        explorer_url: Some("https://sepolia.etherscan.io"),
    },
];

/// Parse a chain id given as decimal or `0x`-prefixed hex.
fn parse_chain_id(raw: &str) -> Option<u64> {
    let raw = raw.trim();
    match raw.strip_prefix("0x").or_else(|| raw.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16).ok(),
        None => raw.parse().ok(),
    }
}

/// Look up a chain by its id string.
pub fn lookup(chain_id: &str) -> Option<&'static ChainInfo> {
    let id = parse_chain_id(chain_id)?;
    CHAINS.iter().find(|c| c.chain_id == id)
}

/// Human-readable chain name, or `"Unknown chain"`.
pub fn chain_name(chain_id: &str) -> String {
    lookup(chain_id)
        .map(|c| c.name)
        .unwrap_or(UNKNOWN_CHAIN)
        .to_string()
}

fn explorer_base(chain_id: &str) -> Option<&'static str> {
    lookup(chain_id).and_then(|c| c.explorer_url)
}

/// Explorer page for a contract address. `None` when the chain is unknown or
/// has no public explorer.
pub fn explorer_url(chain_id: &str, address: &str) -> Option<String> {
    explorer_base(chain_id).map(|base| format!("{base}/address/{address}"))
}

/// Explorer page showing the verified source and ABI of a contract.
pub fn abi_url(chain_id: &str, address: &str) -> Option<String> {
    explorer_url(chain_id, address).map(|url| format!("{url}#code"))
}

/// Explorer page for a transaction.
pub fn tx_url(chain_id: &str, tx_hash: &str) -> Option<String> {
    explorer_base(chain_id).map(|base| format!("{base}/tx/{tx_hash}"))
}
