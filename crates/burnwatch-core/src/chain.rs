//! Chain reads: transaction lookup, `eth_call`, and typed token/pair calls.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use alloy_core::dyn_abi::DynSolValue;
use alloy_primitives::{Address, Bytes, B256, U256};
use async_trait::async_trait;
use burnwatch_rpc_core::{RpcCallExt, RpcTransport};
use serde_json::json;

use crate::abi::{decode_error, ContractAbi};
use crate::error::ChainError;
use crate::types::ChainTransaction;

/// Read access to the chain.
#[async_trait]
pub trait ChainReader: Send + Sync {
    /// `eth_getTransactionByHash`; `None` if the node does not know the hash.
    async fn transaction(&self, hash: B256) -> Result<Option<ChainTransaction>, ChainError>;

    /// `eth_call` against the latest block.
    async fn call(&self, to: Address, data: Bytes) -> Result<Bytes, ChainError>;
}

/// [`ChainReader`] over any JSON-RPC transport.
pub struct RpcChainReader {
    transport: Arc<dyn RpcTransport>,
    ids: AtomicU64,
}

impl RpcChainReader {
    pub fn new(transport: Arc<dyn RpcTransport>) -> Self {
        Self {
            transport,
            ids: AtomicU64::new(1),
        }
    }

    fn next_id(&self) -> u64 {
        self.ids.fetch_add(1, Ordering::Relaxed)
    }
}

#[async_trait]
impl ChainReader for RpcChainReader {
    async fn transaction(&self, hash: B256) -> Result<Option<ChainTransaction>, ChainError> {
        let tx: Option<ChainTransaction> = self
            .transport
            .call(self.next_id(), "eth_getTransactionByHash", vec![json!(hash)])
            .await?;
        Ok(tx)
    }

    async fn call(&self, to: Address, data: Bytes) -> Result<Bytes, ChainError> {
        let params = vec![json!({ "to": to, "data": data }), json!("latest")];
        let out: Bytes = self.transport.call(self.next_id(), "eth_call", params).await?;
        Ok(out)
    }
}

/// Typed ERC-20 and pair calls over a [`ChainReader`].
pub struct ContractReader {
    chain: Arc<dyn ChainReader>,
    abi: ContractAbi,
}

impl ContractReader {
    pub fn new(chain: Arc<dyn ChainReader>) -> Result<Self, ChainError> {
        Ok(Self {
            chain,
            abi: ContractAbi::lp_token()?,
        })
    }

    pub fn chain(&self) -> &dyn ChainReader {
        self.chain.as_ref()
    }

    pub fn abi(&self) -> &ContractAbi {
        &self.abi
    }

    async fn invoke(
        &self,
        to: Address,
        method: &str,
        args: &[DynSolValue],
    ) -> Result<DynSolValue, ChainError> {
        let calldata = self.abi.encode_call(method, args)?;
        let out = self.chain.call(to, calldata).await?;
        self.abi
            .decode_output(method, &out)?
            .into_iter()
            .next()
            .ok_or_else(|| decode_error(method, "empty result"))
    }

    async fn invoke_uint(
        &self,
        to: Address,
        method: &str,
        args: &[DynSolValue],
    ) -> Result<U256, ChainError> {
        let value = self.invoke(to, method, args).await?;
        value
            .as_uint()
            .map(|(v, _)| v)
            .ok_or_else(|| decode_error(method, "expected uint"))
    }

    async fn invoke_address(&self, to: Address, method: &str) -> Result<Address, ChainError> {
        let value = self.invoke(to, method, &[]).await?;
        value
            .as_address()
            .ok_or_else(|| decode_error(method, "expected address"))
    }

    async fn invoke_string(&self, to: Address, method: &str) -> Result<String, ChainError> {
        let value = self.invoke(to, method, &[]).await?;
        value
            .as_str()
            .map(str::to_owned)
            .ok_or_else(|| decode_error(method, "expected string"))
    }

    pub async fn name(&self, token: Address) -> Result<String, ChainError> {
        self.invoke_string(token, "name").await
    }

    pub async fn decimals(&self, token: Address) -> Result<u8, ChainError> {
        let raw = self.invoke_uint(token, "decimals", &[]).await?;
        u8::try_from(raw).map_err(|_| decode_error("decimals", format!("{raw} out of range")))
    }

    pub async fn total_supply(&self, token: Address) -> Result<U256, ChainError> {
        self.invoke_uint(token, "totalSupply", &[]).await
    }

    pub async fn balance_of(&self, token: Address, owner: Address) -> Result<U256, ChainError> {
        self.invoke_uint(token, "balanceOf", &[DynSolValue::Address(owner)])
            .await
    }

    pub async fn token0(&self, pair: Address) -> Result<Address, ChainError> {
        self.invoke_address(pair, "token0").await
    }

    pub async fn token1(&self, pair: Address) -> Result<Address, ChainError> {
        self.invoke_address(pair, "token1").await
    }
}
