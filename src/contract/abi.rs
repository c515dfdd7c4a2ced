//! Charity contract ABI.
//!
//! The ABI is read from a JSON descriptor: either a bare ABI array or a
//! compiler artifact with an `abi` field. When the file is missing or
//! unreadable a built-in human-readable ABI covering every function the
//! gateway calls is used instead.

use std::path::{Path, PathBuf};

use alloy::dyn_abi::{DynSolValue, FunctionExt, JsonAbiExt};
use alloy::json_abi::{Event, Function, JsonAbi};
use alloy::primitives::{Address, Bytes, Log, U256};
use serde::Deserialize;
use thiserror::Error;

use crate::error::{CharityError, CharityResult};

/// Built-in ABI, in human-readable form.
pub const FALLBACK_ABI: &[&str] = &[
    "function nextCampaignId() view returns (uint256)",
    "function campaigns(uint256) view returns (uint256 id, address creator, string title, string description, string media, string location, uint256 targetAmount, address campaignWallet, uint256 collected, uint256 totalDisbursed, uint256 createdAt, uint256 endDate, uint256 updatedAt, string beneficiary, bool active)",
    "function getDonationsCount(uint256 campaignId) view returns (uint256)",
    "function getDonation(uint256 campaignId, uint256 index) view returns (address donor, uint256 amount, uint256 timestamp, uint256 blockNumber, bytes32 txHash)",
    "function getDisbursementsCount(uint256 campaignId) view returns (uint256)",
    "function getDisbursement(uint256 campaignId, uint256 index) view returns (address recipient, uint256 amount, uint256 timestamp, uint256 blockNumber, bytes32 txHash, string proofImage, string note)",
    "function getCommentsCount(uint256 campaignId) view returns (uint256)",
    "function getComment(uint256 campaignId, uint256 index) view returns (address commenter, string text, uint256 timestamp, bool isAnonymous)",
    "function getSupporters(uint256 campaignId) view returns (address[])",
    "function getSupportersCount(uint256 campaignId) view returns (uint256)",
    "function likesCount(uint256) view returns (uint256)",
    "function liked(uint256, address) view returns (bool)",
    "function isAdmin(address account) view returns (bool)",
    "function donate(uint256 campaignId) payable",
    "function like(uint256 campaignId)",
    "function unlike(uint256 campaignId)",
    "function addComment(uint256 campaignId, string text, bool isAnonymous)",
    "function createCampaign(string title, string description, string media, string location, uint256 targetAmount, address campaignWallet, uint256 endDate, string beneficiary) returns (uint256)",
    "function disburseFromContract(uint256 campaignId, address recipient, uint256 amount, string proofImage, string note)",
    "event CampaignCreated(uint256 indexed id, address indexed creator, string title, uint256 targetAmount)",
];

/// Name of the event emitted by `createCampaign`.
pub const CAMPAIGN_CREATED_EVENT: &str = "CampaignCreated";

#[derive(Debug, Error)]
pub enum AbiError {
    #[error("Failed to read ABI file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse ABI file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
}

#[derive(Deserialize)]
#[serde(untagged)]
enum AbiFile {
    Bare(JsonAbi),
    Artifact { abi: JsonAbi },
}

/// Where the active ABI came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AbiSource {
    File(PathBuf),
    Fallback,
}

/// Contract ABI plus the built-in fallback for anything the loaded file lacks.
#[derive(Debug, Clone)]
pub struct ContractAbi {
    abi: JsonAbi,
    builtin: JsonAbi,
    source: AbiSource,
}

fn builtin_abi() -> JsonAbi {
    match JsonAbi::parse(FALLBACK_ABI.iter().copied()) {
        Ok(abi) => abi,
        Err(e) => {
            // Only reachable if FALLBACK_ABI itself is malformed.
            tracing::error!(error = %e, "Built-in ABI failed to parse");
            JsonAbi::default()
        }
    }
}

/// Parse an ABI descriptor from JSON text.
pub fn parse_abi_json(json: &str) -> Result<JsonAbi, serde_json::Error> {
    let file: AbiFile = serde_json::from_str(json)?;
    Ok(match file {
        AbiFile::Bare(abi) | AbiFile::Artifact { abi } => abi,
    })
}

impl ContractAbi {
    /// Load the ABI from `path`, falling back to the built-in ABI on failure.
    pub fn load(path: &Path) -> Self {
        match Self::from_file(path) {
            Ok(abi) => {
                tracing::info!(path = ?path, "Contract ABI loaded");
                abi
            }
            Err(e) => {
                tracing::warn!(error = %e, "Using built-in contract ABI");
                Self::fallback()
            }
        }
    }

    pub fn from_file(path: &Path) -> Result<Self, AbiError> {
        let json = std::fs::read_to_string(path).map_err(|source| AbiError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let abi = parse_abi_json(&json).map_err(|source| AbiError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self {
            abi,
            builtin: builtin_abi(),
            source: AbiSource::File(path.to_path_buf()),
        })
    }

    pub fn fallback() -> Self {
        let builtin = builtin_abi();
        Self {
            abi: builtin.clone(),
            builtin,
            source: AbiSource::Fallback,
        }
    }

    pub fn source(&self) -> &AbiSource {
        &self.source
    }

    /// Look up a function by name, preferring the loaded descriptor.
    pub fn function(&self, name: &str) -> CharityResult<&Function> {
        self.abi
            .function(name)
            .or_else(|| self.builtin.function(name))
            .and_then(|overloads| overloads.first())
            .ok_or_else(|| CharityError::provider(format!("Contract ABI has no function {}", name)))
    }

    pub fn event(&self, name: &str) -> Option<&Event> {
        self.abi
            .event(name)
            .or_else(|| self.builtin.event(name))
            .and_then(|overloads| overloads.first())
    }

    /// Selector-prefixed calldata for `name(args)`.
    pub fn encode_call(&self, name: &str, args: &[DynSolValue]) -> CharityResult<Bytes> {
        let function = self.function(name)?;
        function
            .abi_encode_input(args)
            .map(Bytes::from)
            .map_err(|e| CharityError::provider(format!("Failed to encode {} call: {}", name, e)))
    }

    /// Decode the return data of `name`.
    pub fn decode_output(&self, name: &str, data: &[u8]) -> CharityResult<Vec<DynSolValue>> {
        let function = self.function(name)?;
        function
            .abi_decode_output(data)
            .map_err(|e| CharityError::provider(format!("Failed to decode {} result: {}", name, e)))
    }

    /// Campaign id carried by a `CampaignCreated` log emitted by `contract`.
    pub fn campaign_created_id(&self, contract: Address, logs: &[Log]) -> Option<u64> {
        let selector = self.event(CAMPAIGN_CREATED_EVENT)?.selector();
        logs.iter()
            .filter(|log| log.address == contract)
            .find_map(|log| {
                let topics = log.topics();
                if topics.first() != Some(&selector) {
                    return None;
                }
                let id = U256::from_be_bytes(topics.get(1)?.0);
                u64::try_from(id).ok()
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::{address, LogData, B256};

    #[test]
    fn test_fallback_covers_every_call() {
        let abi = ContractAbi::fallback();
        for name in [
            "nextCampaignId",
            "campaigns",
            "getDonationsCount",
            "getDonation",
            "getDisbursementsCount",
            "getDisbursement",
            "getCommentsCount",
            "getComment",
            "getSupporters",
            "getSupportersCount",
            "likesCount",
            "liked",
            "isAdmin",
            "donate",
            "like",
            "unlike",
            "addComment",
            "createCampaign",
            "disburseFromContract",
        ] {
            assert!(abi.function(name).is_ok(), "missing {}", name);
        }
        assert!(abi.event(CAMPAIGN_CREATED_EVENT).is_some());
        assert_eq!(abi.source(), &AbiSource::Fallback);
    }

    #[test]
    fn test_parse_artifact_and_bare_array() {
        let bare = r#"[{"type":"function","name":"nextCampaignId","inputs":[],"outputs":[{"name":"","type":"uint256","internalType":"uint256"}],"stateMutability":"view"}]"#;
        let artifact = format!(r#"{{"contractName":"Charity","abi":{}}}"#, bare);

        assert!(parse_abi_json(bare).unwrap().function("nextCampaignId").is_some());
        assert!(parse_abi_json(&artifact).unwrap().function("nextCampaignId").is_some());
        assert!(parse_abi_json("{\"bytecode\":\"0x\"}").is_err());
    }

    #[test]
    fn test_missing_file_falls_back() {
        let abi = ContractAbi::load(Path::new("/nonexistent/charityAbi.json"));
        assert_eq!(abi.source(), &AbiSource::Fallback);
    }

    #[test]
    fn test_encode_decode_next_campaign_id() {
        let abi = ContractAbi::fallback();
        let data = abi.encode_call("nextCampaignId", &[]).unwrap();
        assert_eq!(data.len(), 4);

        let output = DynSolValue::Uint(U256::from(7), 256).abi_encode();
        let values = abi.decode_output("nextCampaignId", &output).unwrap();
        assert_eq!(values, vec![DynSolValue::Uint(U256::from(7), 256)]);
    }

    #[test]
    fn test_campaign_created_id() {
        let abi = ContractAbi::fallback();
        let contract = address!("7fF862bAD0628e1987037294C3c4bc3d6f367471");
        let selector = abi.event(CAMPAIGN_CREATED_EVENT).unwrap().selector();
        let log = Log {
            address: contract,
            data: LogData::new_unchecked(
                vec![selector, B256::left_padding_from(&[5]), B256::ZERO],
                Bytes::new(),
            ),
        };

        assert_eq!(abi.campaign_created_id(contract, &[log.clone()]), Some(5));
        // Logs from other contracts are ignored.
        assert_eq!(abi.campaign_created_id(Address::ZERO, &[log]), None);
    }
}
