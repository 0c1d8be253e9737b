//! Builds the unsigned approval and swap calls

use alloy_primitives::{Address, U256};
use alloy_sol_types::SolCall;

use crate::{
    abi::{IERC20::approveCall, IUniswapV2Router02::swapExactTokensForTokensCall},
    error::SwapError,
    types::{CallDescription, Deadline},
};

/// Builds calls against one input token and one router
#[derive(Debug, Clone, Copy)]
pub struct TransactionBuilder {
    /// The token sold, which is the target of the approval
    token_in: Address,
    /// The router that executes the swap
    router: Address,
}

impl TransactionBuilder {
    /// Constructor
    pub fn new(token_in: Address, router: Address) -> Self {
        Self { token_in, router }
    }

    /// Build an `approve` call letting `spender` move exactly `amount` of the
    /// input token
    pub fn build_approval(&self, spender: Address, amount: U256) -> CallDescription {
        let calldata = approveCall { spender, value: amount }.abi_encode();
        CallDescription::new(self.token_in, calldata.into())
    }

    /// Build a `swapExactTokensForTokens` call on the router
    ///
    /// The deadline is encoded as given; checking it against the wall clock is
    /// left to the caller, since build and submission times differ
    pub fn build_swap(
        &self,
        path: &[Address],
        amount_in: U256,
        minimum_output: U256,
        recipient: Address,
        deadline: Deadline,
    ) -> Result<CallDescription, SwapError> {
        if path.len() < 2 {
            return Err(SwapError::configuration(format!(
                "swap path needs at least two tokens, got {}",
                path.len()
            )));
        }
        if path[0] != self.token_in {
            return Err(SwapError::configuration(format!(
                "swap path starts at {:#x}, expected the input token {:#x}",
                path[0], self.token_in
            )));
        }

        let call = swapExactTokensForTokensCall {
            amountIn: amount_in,
            amountOutMin: minimum_output,
            path: path.to_vec(),
            to: recipient,
            deadline: U256::from(deadline.timestamp()),
        };

        Ok(CallDescription::new(self.router, call.abi_encode().into()))
    }
}
