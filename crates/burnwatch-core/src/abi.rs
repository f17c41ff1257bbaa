//! ERC-20 / Uniswap V2 pair ABI subset.
//!
//! Calls are encoded as `selector ++ abi_encode_params(args)` and results are
//! decoded against the function's declared outputs.

use alloy_core::dyn_abi::{DynSolType, DynSolValue};
use alloy_dyn_abi::Specifier;
use alloy_json_abi::{Function, JsonAbi, Param};
use alloy_primitives::{Address, Bytes, B256, U256};
use tiny_keccak::{Hasher, Keccak};

use crate::error::ChainError;

/// `transfer(address,uint256)`
pub const TRANSFER_SELECTOR: [u8; 4] = [0xa9, 0x05, 0x9c, 0xbb];

/// Functions of an LP token and of the tokens it pairs.
pub const LP_TOKEN_ABI: &str = r#"[
    {"type": "function", "name": "transfer", "stateMutability": "nonpayable",
     "inputs": [{"name": "to", "type": "address"}, {"name": "value", "type": "uint256"}],
     "outputs": [{"name": "", "type": "bool"}]},
    {"type": "function", "name": "balanceOf", "stateMutability": "view",
     "inputs": [{"name": "owner", "type": "address"}],
     "outputs": [{"name": "", "type": "uint256"}]},
    {"type": "function", "name": "totalSupply", "stateMutability": "view",
     "inputs": [], "outputs": [{"name": "", "type": "uint256"}]},
    {"type": "function", "name": "name", "stateMutability": "view",
     "inputs": [], "outputs": [{"name": "", "type": "string"}]},
    {"type": "function", "name": "symbol", "stateMutability": "view",
     "inputs": [], "outputs": [{"name": "", "type": "string"}]},
    {"type": "function", "name": "decimals", "stateMutability": "view",
     "inputs": [], "outputs": [{"name": "", "type": "uint8"}]},
    {"type": "function", "name": "token0", "stateMutability": "view",
     "inputs": [], "outputs": [{"name": "", "type": "address"}]},
    {"type": "function", "name": "token1", "stateMutability": "view",
     "inputs": [], "outputs": [{"name": "", "type": "address"}]}
]"#;

/// keccak256 of `Transfer(address,address,uint256)`, the log's `topics[0]`.
pub fn transfer_topic() -> B256 {
    keccak256_signature("Transfer(address,address,uint256)")
}

/// keccak256 of a canonical signature string.
pub fn keccak256_signature(signature: &str) -> B256 {
    let mut hasher = Keccak::v256();
    let mut output = [0u8; 32];
    hasher.update(signature.as_bytes());
    hasher.finalize(&mut output);
    B256::from(output)
}

/// Encoder/decoder over a parsed ABI.
#[derive(Debug, Clone)]
pub struct ContractAbi {
    abi: JsonAbi,
}

impl ContractAbi {
    pub fn from_json(abi_json: &str) -> Result<Self, ChainError> {
        let abi: JsonAbi = serde_json::from_str(abi_json)
            .map_err(|e| ChainError::Abi(format!("invalid ABI JSON: {e}")))?;
        Ok(Self { abi })
    }

    /// The LP token ABI.
    pub fn lp_token() -> Result<Self, ChainError> {
        Self::from_json(LP_TOKEN_ABI)
    }

    fn function(&self, name: &str) -> Result<&Function, ChainError> {
        self.abi
            .function(name)
            .and_then(|overloads| overloads.first())
            .ok_or_else(|| ChainError::Abi(format!("function '{name}' not found in ABI")))
    }

    pub fn selector(&self, name: &str) -> Result<[u8; 4], ChainError> {
        Ok(self.function(name)?.selector().0)
    }

    /// Build calldata for `name(args...)`.
    pub fn encode_call(&self, name: &str, args: &[DynSolValue]) -> Result<Bytes, ChainError> {
        let func = self.function(name)?;
        if args.len() != func.inputs.len() {
            return Err(ChainError::Abi(format!(
                "{name}: expected {} arguments, got {}",
                func.inputs.len(),
                args.len()
            )));
        }
        let mut calldata = func.selector().to_vec();
        calldata.extend(DynSolValue::Tuple(args.to_vec()).abi_encode_params());
        Ok(calldata.into())
    }

    /// Decode the arguments of a call to `name`; `data` excludes the selector.
    pub fn decode_input(&self, name: &str, data: &[u8]) -> Result<Vec<DynSolValue>, ChainError> {
        decode_params(name, &self.function(name)?.inputs, data)
    }

    /// Decode the return data of `name`.
    pub fn decode_output(&self, name: &str, data: &[u8]) -> Result<Vec<DynSolValue>, ChainError> {
        decode_params(name, &self.function(name)?.outputs, data)
    }

    /// Decode `transfer(address,uint256)` arguments.
    pub fn decode_transfer(&self, data: &[u8]) -> Result<(Address, U256), ChainError> {
        let values = self.decode_input("transfer", data)?;
        match values.as_slice() {
            [to, value] => {
                let to = to.as_address();
                let value = value.as_uint().map(|(v, _)| v);
                to.zip(value).ok_or_else(|| decode_error("transfer", "unexpected argument types"))
            }
            _ => Err(decode_error("transfer", "expected two arguments")),
        }
    }
}

fn decode_params(name: &str, params: &[Param], data: &[u8]) -> Result<Vec<DynSolValue>, ChainError> {
    let types = params
        .iter()
        .map(|p| p.resolve().map_err(|e| decode_error(name, e)))
        .collect::<Result<Vec<DynSolType>, _>>()?;

    match DynSolType::Tuple(types).abi_decode_params(data) {
        Ok(DynSolValue::Tuple(values)) => Ok(values),
        Ok(other) => Ok(vec![other]),
        Err(e) => Err(decode_error(name, e)),
    }
}

pub(crate) fn decode_error(method: &str, reason: impl ToString) -> ChainError {
    ChainError::Decode {
        method: method.to_string(),
        reason: reason.to_string(),
    }
}
