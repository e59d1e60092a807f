//! Request identity: which operations are allowed, and which ledger key a
//! (contract, operation) pair collapses onto.

use std::fmt;

use crate::error::PipelineError;

/// Operation classes. Retries of the same class on the same contract land
/// on the same ledger record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationClass {
    Mint,
    Transfer,
}

impl OperationClass {
    pub fn suffix(self) -> &'static str {
        match self {
            OperationClass::Mint => "-mint",
            OperationClass::Transfer => "-transfer",
        }
    }
}

/// The closed set of contract functions the relay will execute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    MintSampleNft,
    TransferSampleNft,
    MintSampleFt,
    TransferSampleFt,
}

impl OperationKind {
    pub const ALL: [OperationKind; 4] = [
        OperationKind::MintSampleNft,
        OperationKind::TransferSampleNft,
        OperationKind::MintSampleFt,
        OperationKind::TransferSampleFt,
    ];

    /// The contract function name as it appears on chain.
    pub fn wire_name(self) -> &'static str {
        match self {
            OperationKind::MintSampleNft => "mint_sample_nft",
            OperationKind::TransferSampleNft => "transfer_sample_nft",
            OperationKind::MintSampleFt => "mint_sample_ft",
            OperationKind::TransferSampleFt => "transfer_sample_ft",
        }
    }

    pub fn from_wire_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.wire_name() == name)
    }

    pub fn class(self) -> OperationClass {
        match self {
            OperationKind::MintSampleNft | OperationKind::MintSampleFt => OperationClass::Mint,
            OperationKind::TransferSampleNft | OperationKind::TransferSampleFt => {
                OperationClass::Transfer
            }
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire_name())
    }
}

/// Derive the idempotency key for an operation on a contract.
///
/// `abc123` + `mint_sample_nft` → `abc123-mint`.
pub fn derive_request_id(contract: &str, op_name: &str) -> Result<String, PipelineError> {
    let kind =
        OperationKind::from_wire_name(op_name).ok_or_else(|| PipelineError::UnsupportedOperation {
            name: op_name.to_string(),
        })?;
    Ok(format!("{}{}", contract, kind.class().suffix()))
}
