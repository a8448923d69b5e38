//! Protocol Buffers v3 wire messages for the peer request/reply protocol.
//!
//! Derived directly on `prost::Message` the way `rust-dd-tako`'s protobuf
//! extractor documents doing it for its own request types — no `.proto`
//! file or `build.rs` codegen step, just field attributes. Field numbers
//! and types mirror `original_source/ocachepb/ocachepb.pb.go`: a fetch
//! request carries `relation` (group name) and `key`, a fetch response
//! carries a single `value: bytes` field.

use prost::Message;

/// The request message form of a peer fetch. The default HTTP transport
/// encodes `relation`/`key` in the URL path instead and never constructs
/// this; it exists for alternative transports that carry a request body.
#[derive(Clone, PartialEq, Message)]
pub struct FetchRequest {
    #[prost(string, tag = "1")]
    pub relation: String,
    #[prost(string, tag = "2")]
    pub key: String,
}

/// The response body for a successful fetch: the value's raw bytes.
#[derive(Clone, PartialEq, Message)]
pub struct FetchResponse {
    #[prost(bytes = "vec", tag = "1")]
    pub value: Vec<u8>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fetch_response_round_trips_through_the_wire_format() {
        let response = FetchResponse { value: b"hello".to_vec() };
        let encoded = response.encode_to_vec();
        let decoded = FetchResponse::decode(&encoded[..]).unwrap();
        assert_eq!(decoded.value, b"hello");
    }

    #[test]
    fn fetch_request_round_trips_through_the_wire_format() {
        let request = FetchRequest { relation: "scores".to_string(), key: "Tom".to_string() };
        let encoded = request.encode_to_vec();
        let decoded = FetchRequest::decode(&encoded[..]).unwrap();
        assert_eq!(decoded.relation, "scores");
        assert_eq!(decoded.key, "Tom");
    }
}
