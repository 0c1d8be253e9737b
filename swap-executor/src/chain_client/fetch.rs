//! Token and pool reads through the router's factory

use alloy::providers::Provider;
use alloy_primitives::{Address, U256};
use async_trait::async_trait;
use tracing::{info, instrument, warn};

use crate::{
    abi::{IUniswapV2Factory, IUniswapV2Pair, IUniswapV2Router02, IERC20},
    types::{PairSnapshot, Token},
};

use super::{error::ChainClientError, ChainClient, PairDataSource};

#[async_trait]
impl PairDataSource for ChainClient {
    #[instrument(skip(self))]
    async fn fetch_token(&self, address: Address) -> Result<Token, ChainClientError> {
        let code = self.provider.get_code_at(address).await.map_err(ChainClientError::rpc)?;
        if code.is_empty() {
            return Err(ChainClientError::not_found(format!("no contract at {address:#x}")));
        }

        let erc20 = IERC20::new(address, self.provider.clone());
        let decimals = erc20.decimals().call().await.map_err(ChainClientError::rpc)?;

        // The symbol is only used for logging, some tokens return it as bytes32
        let symbol = match erc20.symbol().call().await {
            Ok(symbol) => Some(symbol),
            Err(e) => {
                warn!("could not read symbol of {address:#x}: {e}");
                None
            },
        };

        Ok(Token::new(address, decimals, symbol))
    }

    #[instrument(skip_all, fields(token_a = %token_a.label(), token_b = %token_b.label()))]
    async fn fetch_pair(
        &self,
        token_a: &Token,
        token_b: &Token,
    ) -> Result<PairSnapshot, ChainClientError> {
        let pair_address = self.get_pair_address(token_a.address, token_b.address).await?;
        let pair = IUniswapV2Pair::new(pair_address, self.provider.clone());

        let token0 = pair.token0().call().await.map_err(ChainClientError::rpc)?;
        let reserves = pair.getReserves().call().await.map_err(ChainClientError::rpc)?;
        let reserve0 = U256::from(reserves.reserve0);
        let reserve1 = U256::from(reserves.reserve1);

        let (reserve_a, reserve_b) = if token0 == token_a.address {
            (reserve0, reserve1)
        } else if token0 == token_b.address {
            (reserve1, reserve0)
        } else {
            return Err(ChainClientError::parse(format!(
                "pool {pair_address:#x} holds neither {} nor {}",
                token_a.label(),
                token_b.label()
            )));
        };

        info!(%reserve_a, %reserve_b, "fetched reserves from pool {pair_address:#x}");
        Ok(PairSnapshot {
            token_a: token_a.clone(),
            token_b: token_b.clone(),
            reserve_a,
            reserve_b,
            fee_bps: self.fee_bps,
        })
    }
}

impl ChainClient {
    /// Resolve the pool for a pair through the router's factory
    async fn get_pair_address(
        &self,
        token_a: Address,
        token_b: Address,
    ) -> Result<Address, ChainClientError> {
        let router = IUniswapV2Router02::new(self.router, self.provider.clone());
        let factory_address = router.factory().call().await.map_err(ChainClientError::rpc)?;

        let factory = IUniswapV2Factory::new(factory_address, self.provider.clone());
        let pair_address =
            factory.getPair(token_a, token_b).call().await.map_err(ChainClientError::rpc)?;

        if pair_address == Address::ZERO {
            return Err(ChainClientError::not_found(format!(
                "no pool for {token_a:#x}/{token_b:#x} in factory {factory_address:#x}"
            )));
        }

        Ok(pair_address)
    }
}
