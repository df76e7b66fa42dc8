//! Hand-built ABI encode/decode helpers for the DP-request, DO-request,
//! order and heartbeat contracts.
//!
//! Concrete contract addresses and full Solidity ABIs are out of scope
//! (spec.md §1: "the concrete smart-contract ABIs" are an external
//! collaborator, specified only at their interface with the core) so
//! this builds call data with free functions over `ethers_core::abi`
//! rather than a generated `abigen!` binding or a full `ethabi::Contract`
//! (contrast `centrifuge-centrifuge-chain`'s `xcm_router_contract`, which
//! builds one `Contract` because it needs the full function table; we
//! only ever need one selector at a time).

use ethers_core::abi::{decode, encode, Event, EventParam, ParamType, RawLog, Token};
use ethers_core::types::{Bytes, TransactionReceipt, U256};
use ethers_core::utils::id;

use etny_chain::ChainError;
use etny_domain::{DoRequest, DpRequest, Metadata, Order, OrderStatus, RequestStatus};

fn selector(signature: &str) -> [u8; 4] {
    let hash = id(signature);
    let mut sel = [0u8; 4];
    sel.copy_from_slice(&hash[..4]);
    sel
}

fn encode_call(signature: &str, tokens: &[Token]) -> Bytes {
    let mut data = selector(signature).to_vec();
    data.extend(encode(tokens));
    Bytes::from(data)
}

fn decode_output(what: &'static str, types: &[ParamType], data: &Bytes) -> Result<Vec<Token>, ChainError> {
    decode(types, data).map_err(|source| ChainError::Decode { what, source })
}

fn token_u64(token: &Token) -> Option<u64> {
    token.clone().into_uint().map(|v| v.low_u64())
}

fn token_string(token: &Token) -> Option<String> {
    token.clone().into_string()
}

fn token_address_string(token: &Token) -> Option<String> {
    token.clone().into_address().map(|a| format!("{a:#x}"))
}

/// `getDpRequest(uint256) -> (uint256 id, address operator, uint256 cpu,
/// uint256 memory, uint256 storage, uint256 bandwidth, uint256 duration,
/// uint256 price, uint8 status, string uuid, string version, string geo)`
pub fn get_dp_request_call(dp_id: u64) -> Bytes {
    encode_call("getDpRequest(uint256)", &[Token::Uint(U256::from(dp_id))])
}

pub fn decode_dp_request(data: &Bytes) -> Result<DpRequest, ChainError> {
    let types = [
        ParamType::Uint(256),
        ParamType::Address,
        ParamType::Uint(256),
        ParamType::Uint(256),
        ParamType::Uint(256),
        ParamType::Uint(256),
        ParamType::Uint(256),
        ParamType::Uint(256),
        ParamType::Uint(8),
        ParamType::String,
        ParamType::String,
        ParamType::String,
    ];
    let tokens = decode_output("DpRequest", &types, data)?;
    let status_raw = token_u64(&tokens[8]).unwrap_or_default() as u8;
    let status = RequestStatus::try_from(status_raw)
        .map_err(|_| ChainError::Decode { what: "DpRequest.status", source: ethers_core::abi::Error::InvalidData })?;
    Ok(DpRequest {
        id: token_u64(&tokens[0]).unwrap_or_default(),
        operator: token_address_string(&tokens[1]).unwrap_or_default(),
        cpu: token_u64(&tokens[2]).unwrap_or_default(),
        memory: token_u64(&tokens[3]).unwrap_or_default(),
        storage: token_u64(&tokens[4]).unwrap_or_default(),
        bandwidth: token_u64(&tokens[5]).unwrap_or_default(),
        duration: token_u64(&tokens[6]).unwrap_or_default(),
        price: token_u64(&tokens[7]).unwrap_or_default(),
        status,
        uuid: token_string(&tokens[9]).unwrap_or_default(),
        version: token_string(&tokens[10]).unwrap_or_default(),
        geo: token_string(&tokens[11]).unwrap_or_default(),
    })
}

/// `createDpRequest(uint256 cpu, uint256 memory, uint256 storage,
/// uint256 bandwidth, uint256 duration, uint256 price, string uuid,
/// string version, string geo)`, emitting `DPRequestCreated(uint256 id)`.
pub fn create_dp_request_call(
    cpu: u64,
    memory: u64,
    storage: u64,
    bandwidth: u64,
    duration: u64,
    price: u64,
    uuid: &str,
    version: &str,
    geo: &str,
) -> Bytes {
    encode_call(
        "createDpRequest(uint256,uint256,uint256,uint256,uint256,uint256,string,string,string)",
        &[
            Token::Uint(U256::from(cpu)),
            Token::Uint(U256::from(memory)),
            Token::Uint(U256::from(storage)),
            Token::Uint(U256::from(bandwidth)),
            Token::Uint(U256::from(duration)),
            Token::Uint(U256::from(price)),
            Token::String(uuid.to_string()),
            Token::String(version.to_string()),
            Token::String(geo.to_string()),
        ],
    )
}

fn dp_request_created_event() -> Event {
    Event {
        name: "DPRequestCreated".to_string(),
        inputs: vec![EventParam { name: "id".to_string(), kind: ParamType::Uint(256), indexed: false }],
        anonymous: false,
    }
}

/// Extracts the new DP-request id from the receipt of a `createDpRequest`
/// transaction (spec.md §4.4 "Register").
pub fn decode_dp_request_created(receipt: &TransactionReceipt) -> Result<u64, ChainError> {
    let event = dp_request_created_event();
    let logs = etny_chain::ChainClient::<etny_chain::EthersTransport>::decode_events(receipt, &event)?;
    let log = logs.first().ok_or_else(|| ChainError::Decode {
        what: "DPRequestCreated",
        source: ethers_core::abi::Error::InvalidData,
    })?;
    log.params
        .first()
        .and_then(|p| token_u64(&p.value))
        .ok_or_else(|| ChainError::Decode { what: "DPRequestCreated.id", source: ethers_core::abi::Error::InvalidData })
}

/// `getDpRequestsByOperator(address) -> uint256[]`
pub fn get_dp_requests_by_operator_call(operator: ethers_core::types::Address) -> Bytes {
    encode_call("getDpRequestsByOperator(address)", &[Token::Address(operator)])
}

pub fn decode_dp_request_ids(data: &Bytes) -> Result<Vec<u64>, ChainError> {
    let types = [ParamType::Array(Box::new(ParamType::Uint(256)))];
    let tokens = decode_output("DpRequestIds", &types, data)?;
    let array = tokens.into_iter().next().and_then(Token::into_array).unwrap_or_default();
    Ok(array.iter().filter_map(token_u64).collect())
}

/// `getDoRequest(uint256) -> (uint256 id, address owner, uint256 cpu,
/// uint256 memory, uint256 storage, uint256 bandwidth, uint256 duration,
/// uint256 price, uint8 status, string version, string spec, string
/// payloadHash, string inputHash, string pinnedOperator)`
pub fn get_do_request_call(do_id: u64) -> Bytes {
    encode_call("getDoRequest(uint256)", &[Token::Uint(U256::from(do_id))])
}

pub fn decode_do_request_with_metadata(data: &Bytes) -> Result<(DoRequest, Metadata), ChainError> {
    let types = [
        ParamType::Uint(256),
        ParamType::Address,
        ParamType::Uint(256),
        ParamType::Uint(256),
        ParamType::Uint(256),
        ParamType::Uint(256),
        ParamType::Uint(256),
        ParamType::Uint(256),
        ParamType::Uint(8),
        ParamType::String,
        ParamType::String,
        ParamType::String,
        ParamType::String,
        ParamType::String,
    ];
    let tokens = decode_output("DoRequest", &types, data)?;
    let status_raw = token_u64(&tokens[8]).unwrap_or_default() as u8;
    let status = RequestStatus::try_from(status_raw)
        .map_err(|_| ChainError::Decode { what: "DoRequest.status", source: ethers_core::abi::Error::InvalidData })?;
    let do_req = DoRequest {
        id: token_u64(&tokens[0]).unwrap_or_default(),
        owner: token_address_string(&tokens[1]).unwrap_or_default(),
        cpu: token_u64(&tokens[2]).unwrap_or_default(),
        memory: token_u64(&tokens[3]).unwrap_or_default(),
        storage: token_u64(&tokens[4]).unwrap_or_default(),
        bandwidth: token_u64(&tokens[5]).unwrap_or_default(),
        duration: token_u64(&tokens[6]).unwrap_or_default(),
        price: token_u64(&tokens[7]).unwrap_or_default(),
        status,
    };
    let metadata_tuple = [
        token_string(&tokens[9]).unwrap_or_default(),
        token_string(&tokens[10]).unwrap_or_default(),
        token_string(&tokens[11]).unwrap_or_default(),
        token_string(&tokens[12]).unwrap_or_default(),
        token_string(&tokens[13]).unwrap_or_default(),
    ];
    let metadata = Metadata::parse(metadata_tuple)
        .map_err(|_| ChainError::Decode { what: "DoRequest.metadata", source: ethers_core::abi::Error::InvalidData })?;
    Ok((do_req, metadata))
}

/// `getDoRequestsCount() -> uint256`
pub fn get_do_requests_count_call() -> Bytes {
    encode_call("getDoRequestsCount()", &[])
}

pub fn decode_count(data: &Bytes) -> Result<u64, ChainError> {
    let tokens = decode_output("Count", &[ParamType::Uint(256)], data)?;
    Ok(token_u64(&tokens[0]).unwrap_or_default())
}

/// `placeOrder(uint256 doId, uint256 dpId)`, emitting
/// `PlaceOrderEV(uint256 orderId)` on success and reverting if the DO was
/// already taken (spec.md §4.6 "Place").
pub fn place_order_call(do_id: u64, dp_id: u64) -> Bytes {
    encode_call("placeOrder(uint256,uint256)", &[Token::Uint(U256::from(do_id)), Token::Uint(U256::from(dp_id))])
}

fn place_order_event() -> Event {
    Event {
        name: "PlaceOrderEV".to_string(),
        inputs: vec![EventParam { name: "orderId".to_string(), kind: ParamType::Uint(256), indexed: false }],
        anonymous: false,
    }
}

pub fn decode_place_order_event(receipt: &TransactionReceipt) -> Result<u64, ChainError> {
    let event = place_order_event();
    let logs = etny_chain::ChainClient::<etny_chain::EthersTransport>::decode_events(receipt, &event)?;
    let log = logs
        .first()
        .ok_or_else(|| ChainError::Decode { what: "PlaceOrderEV", source: ethers_core::abi::Error::InvalidData })?;
    log.params
        .first()
        .and_then(|p| token_u64(&p.value))
        .ok_or_else(|| ChainError::Decode { what: "PlaceOrderEV.orderId", source: ethers_core::abi::Error::InvalidData })
}

/// `getOrder(uint256) -> (uint256 id, address owner, address operator,
/// uint256 doRequestId, uint256 dpRequestId, uint8 status)`
pub fn get_order_call(order_id: u64) -> Bytes {
    encode_call("getOrder(uint256)", &[Token::Uint(U256::from(order_id))])
}

pub fn decode_order(data: &Bytes) -> Result<Order, ChainError> {
    let types = [
        ParamType::Uint(256),
        ParamType::Address,
        ParamType::Address,
        ParamType::Uint(256),
        ParamType::Uint(256),
        ParamType::Uint(8),
    ];
    let tokens = decode_output("Order", &types, data)?;
    let status_raw = token_u64(&tokens[5]).unwrap_or_default() as u8;
    let status = OrderStatus::try_from(status_raw)
        .map_err(|_| ChainError::Decode { what: "Order.status", source: ethers_core::abi::Error::InvalidData })?;
    Ok(Order {
        id: token_u64(&tokens[0]).unwrap_or_default(),
        owner: token_address_string(&tokens[1]).unwrap_or_default(),
        operator: token_address_string(&tokens[2]).unwrap_or_default(),
        do_req_id: token_u64(&tokens[3]).unwrap_or_default(),
        dp_req_id: token_u64(&tokens[4]).unwrap_or_default(),
        status,
    })
}

/// `addResultToOrder(uint256 orderId, string result)`
pub fn add_result_to_order_call(order_id: u64, result: &str) -> Bytes {
    encode_call(
        "addResultToOrder(uint256,string)",
        &[Token::Uint(U256::from(order_id)), Token::String(result.to_string())],
    )
}

/// `logCall()`: the heartbeat write, a no-op state touch used only to
/// keep the operator's last-seen block fresh (spec.md glossary
/// "Heartbeat").
pub fn log_call_call() -> Bytes {
    encode_call("logCall()", &[])
}

/// `getOperatorsCount() -> uint256`: feeds the dispersion factor's `N`
/// (spec.md §4.5 "Dispersion").
pub fn get_operators_count_call() -> Bytes {
    encode_call("getOperatorsCount()", &[])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selectors_are_four_bytes_of_the_signature_hash() {
        let sel = selector("getDpRequest(uint256)");
        assert_eq!(sel.len(), 4);
    }

    #[test]
    fn get_dp_request_call_prefixes_selector_and_encodes_id() {
        let data = get_dp_request_call(42);
        assert_eq!(&data[..4], &selector("getDpRequest(uint256)"));
        assert_eq!(data.len(), 4 + 32);
    }

    #[test]
    fn decode_count_reads_a_single_uint() {
        let encoded = encode(&[Token::Uint(U256::from(7u64))]);
        let bytes = Bytes::from(encoded);
        assert_eq!(decode_count(&bytes).unwrap(), 7);
    }

    #[test]
    fn decode_dp_request_ids_reads_back_an_array() {
        let encoded = encode(&[Token::Array(vec![
            Token::Uint(U256::from(1u64)),
            Token::Uint(U256::from(2u64)),
            Token::Uint(U256::from(3u64)),
        ])]);
        let bytes = Bytes::from(encoded);
        assert_eq!(decode_dp_request_ids(&bytes).unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn decode_order_roundtrips_status() {
        let owner = ethers_core::types::Address::from_low_u64_be(1);
        let operator = ethers_core::types::Address::from_low_u64_be(2);
        let encoded = encode(&[
            Token::Uint(U256::from(9u64)),
            Token::Address(owner),
            Token::Address(operator),
            Token::Uint(U256::from(10u64)),
            Token::Uint(U256::from(11u64)),
            Token::Uint(U256::from(1u64)),
        ]);
        let bytes = Bytes::from(encoded);
        let order = decode_order(&bytes).unwrap();
        assert_eq!(order.id, 9);
        assert_eq!(order.do_req_id, 10);
        assert_eq!(order.dp_req_id, 11);
        assert_eq!(order.status, OrderStatus::Processing);
    }
}
