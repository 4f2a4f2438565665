//! Data-field payloads.
//!
//! ```text
//! call:    <function>@<arg>@<arg>...
//! deploy:  <code hex>@0500@<metadata hex>@<arg>...
//! ```
//!
//! `0500` is the VM type tag for WASM contracts.

use super::types::{Argument, CodeMetadata};

/// VM identifier for WASM contracts.
pub const WASM_VM_TYPE: &str = "0500";

/// Encodes a contract call.
pub fn call_data(function: &str, arguments: &[Argument]) -> String {
    let mut data = String::from(function);
    for arg in arguments {
        data.push('@');
        data.push_str(&arg.to_hex());
    }
    data
}

/// Encodes a contract deployment.
pub fn deploy_data(code: &[u8], metadata: CodeMetadata, arguments: &[Argument]) -> String {
    let mut data = format!("{}@{}@{}", hex::encode(code), WASM_VM_TYPE, metadata);
    for arg in arguments {
        data.push('@');
        data.push_str(&arg.to_hex());
    }
    data
}
