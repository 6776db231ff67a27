//! Execution-failure diagnostics
//!
//! Turns the revert payload and internal-transaction trail of a failed Tron transaction into a
//! single human-readable message. Decoding never fails: every malformed payload falls back to
//! a less specific description.

use crate::abi;
use crate::address::TronAddress;
use crate::rpc::{InternalTransaction, TransactionInfo};

/// Message used when the node reports a failure without a result message.
pub const DEFAULT_FAILURE_MESSAGE: &str = "Tron transaction execution failed";

const ERROR_STRING_SELECTOR: [u8; 4] = [0x08, 0xc3, 0x79, 0xa0];
const PANIC_SELECTOR: [u8; 4] = [0x4e, 0x48, 0x7b, 0x71];
const ERC20_TRANSFER_SELECTOR_HEX: &str = "a9059cbb";
const EXTRA_PREVIEW_CHARS: usize = 160;
const EXTRA_SCAN_HEX_CHARS: usize = 512;

/// Custom errors of the token-transfer library and the controller, by declared signature.
pub const KNOWN_CUSTOM_ERRORS: &[(&str, &str)] = &[
    ("ETHTransferFailed()", "SafeTransferLib.ETHTransferFailed()"),
    ("TransferFromFailed()", "SafeTransferLib.TransferFromFailed()"),
    ("TransferFailed()", "SafeTransferLib.TransferFailed()"),
    ("ApproveFailed()", "SafeTransferLib.ApproveFailed()"),
    ("TotalSupplyQueryFailed()", "SafeTransferLib.TotalSupplyQueryFailed()"),
    ("ExchangeRateMismatch()", "ExchangeRateMismatch()"),
    ("InsufficientLpLiquidity()", "InsufficientLpLiquidity()"),
    ("InsufficientPulledAmount()", "InsufficientPulledAmount()"),
    ("OnlyExecutor()", "OnlyExecutor()"),
    ("OnlyLp()", "OnlyLp()"),
    ("OnlyOwner()", "OnlyOwner()"),
    ("OutAmountMismatch()", "OutAmountMismatch()"),
    ("RouteNotSet()", "RouteNotSet()"),
    ("ZeroOwnerAddress()", "ZeroOwnerAddress()"),
];

/// Quotes text as a JSON string literal, so control characters read `\u0001` style.
fn json_quote(text: &str) -> String {
    serde_json::to_string(text).unwrap_or_else(|_| format!("{:?}", text))
}

/// Decodes EVM revert data into a short description.
///
/// # Returns
///
/// * `None` - Payload is empty or its selector is not recognized
/// * `Some(String)` - `Error("...")`, `Panic(n)`, or the name of a known custom error
pub fn decode_revert_data(data: &[u8]) -> Option<String> {
    if data.len() < 4 {
        return None;
    }
    let (selector, args) = data.split_at(4);

    if selector == ERROR_STRING_SELECTOR {
        return Some(match abi::decode_string(args, 0) {
            Ok(reason) => format!("Error({})", json_quote(&reason)),
            Err(_) => "Error(<decode failed>)".to_string(),
        });
    }
    if selector == PANIC_SELECTOR {
        return Some(match abi::decode_u256(args, 0) {
            Ok(code) => format!("Panic({})", code),
            Err(_) => "Panic(<decode failed>)".to_string(),
        });
    }

    KNOWN_CUSTOM_ERRORS
        .iter()
        .find(|(signature, _)| abi::selector(signature) == selector)
        .map(|(_, name)| name.to_string())
}

/// Builds the diagnostic for a failed transaction.
///
/// The node's result message comes first; revert details and the internal-transaction
/// summary follow in parentheses. Without revert data the result message is used as is.
pub fn describe_failure(info: &TransactionInfo) -> String {
    let res_message = info
        .result_message()
        .unwrap_or_else(|| DEFAULT_FAILURE_MESSAGE.to_string());
    let internal = summarize_internal_transactions(&info.internal_transactions);
    let revert_data = info.revert_data();

    let detail = if revert_data.is_empty() {
        None
    } else {
        Some(decode_revert_data(&revert_data).unwrap_or_else(|| {
            let head = &revert_data[..revert_data.len().min(4)];
            format!(
                "revertData=0x{}, len={} bytes",
                hex::encode(head),
                revert_data.len()
            )
        }))
    };

    let suffix = match (detail, internal) {
        (Some(detail), Some(internal)) => format!("{}; {}", detail, internal),
        (Some(detail), None) => detail,
        (None, Some(internal)) => internal,
        (None, None) => return res_message,
    };
    format!("{} ({})", res_message, suffix)
}

/// Summarizes the first rejected internal transaction (or the last one if none was rejected).
pub fn summarize_internal_transactions(internal: &[InternalTransaction]) -> Option<String> {
    let tx = internal
        .iter()
        .find(|tx| tx.rejected)
        .or_else(|| internal.last())?;

    let mut parts = vec![format!("internalTxs={}", internal.len())];
    if tx.rejected {
        parts.push("rejected=true".to_string());
    }
    if let (Ok(from), Ok(to)) = (
        TronAddress::from_hex(&tx.caller_address),
        TronAddress::from_hex(&tx.transfer_to_address),
    ) {
        parts.push(format!("{}->{}", from, to));
    }
    let note = tx.note_text();
    if !note.is_empty() {
        parts.push(format!("note={}", json_quote(&note)));
    }

    let transfer = decode_erc20_transfer(&tx.extra);
    if let Some((to, value)) = &transfer {
        parts.push(format!("erc20.transfer(to={}, value={})", to.to_evm_hex(), value));
    } else if !tx.extra.is_empty() {
        let preview: String = tx.extra.chars().take(EXTRA_PREVIEW_CHARS).collect();
        parts.push(format!("extra={}", json_quote(&preview)));
    }

    Some(parts.join(" "))
}

/// Finds `transfer(address,uint256)` calldata embedded in an internal transaction's `extra`.
fn decode_erc20_transfer(extra: &str) -> Option<(TronAddress, ethereum_types::U256)> {
    let lowered = extra.to_ascii_lowercase();
    let start = lowered.find(ERC20_TRANSFER_SELECTOR_HEX)? + ERC20_TRANSFER_SELECTOR_HEX.len();
    let args: String = lowered[start..]
        .chars()
        .take_while(|c| c.is_ascii_hexdigit())
        .take(EXTRA_SCAN_HEX_CHARS)
        .collect();
    if args.len() < 128 {
        return None;
    }
    let bytes = hex::decode(&args[..128]).ok()?;
    let to = abi::decode_address(&bytes, 0).ok()?;
    let value = abi::decode_u256(&bytes, 1).ok()?;
    Some((to, value))
}
