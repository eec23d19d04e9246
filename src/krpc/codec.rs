//! Bencode ↔ typed message codec.
//!
//! KRPC's per-method argument dicts have different shapes, so we decode
//! through `serde_bencode::value::Value` rather than a single derived
//! struct, matching the dynamic-dict approach the wire format actually
//! uses (spec.md Section 4.7, C7).

use std::collections::HashMap;
use std::net::Ipv4Addr;

use serde_bencode::value::Value;

use crate::domain::entities::Id;
use crate::domain::token::Token;
use crate::krpc::compact::{decode_compact_node_list, decode_compact_peer_list, encode_compact_node_list, encode_compact_peer};
use crate::krpc::message::{
    ErrorCode, GetPeersResult, KrpcError, MalformedMessage, Message, Query, Response, TransactionId,
};

/// Datagrams larger than this are rejected before parsing (spec.md Section 6).
pub const MAX_DATAGRAM_LEN: usize = 1500;

type Dict = HashMap<Vec<u8>, Value>;

fn get<'a>(dict: &'a Dict, key: &'static str) -> Result<&'a Value, MalformedMessage> {
    dict.get(key.as_bytes()).ok_or(MalformedMessage::MissingKey(key))
}

fn get_bytes<'a>(dict: &'a Dict, key: &'static str) -> Result<&'a [u8], MalformedMessage> {
    match get(dict, key)? {
        Value::Bytes(b) => Ok(b),
        _ => Err(MalformedMessage::WrongType(key)),
    }
}

fn get_int(dict: &Dict, key: &'static str) -> Result<i64, MalformedMessage> {
    match get(dict, key)? {
        Value::Int(i) => Ok(*i),
        _ => Err(MalformedMessage::WrongType(key)),
    }
}

fn get_optional_flag(dict: &Dict, key: &'static str) -> bool {
    matches!(dict.get(key.as_bytes()), Some(Value::Int(1)))
}

fn get_id(dict: &Dict, key: &'static str) -> Result<Id, MalformedMessage> {
    Id::from_bytes(get_bytes(dict, key)?).map_err(|e| MalformedMessage::BadCompactLength {
        expected: 20,
        got: e.got_len,
    })
}

fn as_dict<'a>(value: &'a Value, key: &'static str) -> Result<&'a Dict, MalformedMessage> {
    match value {
        Value::Dict(d) => Ok(d),
        _ => Err(MalformedMessage::WrongType(key)),
    }
}

/// Decode a single inbound datagram into a typed message.
///
/// Reference: spec.md Section 4.7, "Decoder contract".
pub fn decode(data: &[u8]) -> Result<Message, MalformedMessage> {
    if data.len() > MAX_DATAGRAM_LEN {
        return Err(MalformedMessage::DatagramTooLarge(data.len()));
    }
    let top: Dict = match serde_bencode::from_bytes::<Value>(data) {
        Ok(Value::Dict(d)) => d,
        _ => return Err(MalformedMessage::NotADict),
    };

    let transaction_id: TransactionId = get_bytes(&top, "t")?.to_vec();
    let y = get_bytes(&top, "y")?;

    match y {
        b"q" => decode_query(&top, transaction_id),
        b"r" => decode_response(&top, transaction_id),
        b"e" => decode_error(&top, transaction_id),
        _ => Err(MalformedMessage::UnknownDiscriminator),
    }
}

fn decode_query(top: &Dict, transaction_id: TransactionId) -> Result<Message, MalformedMessage> {
    let method = get_bytes(top, "q")?.to_vec();
    let args = as_dict(get(top, "a")?, "a")?;
    let sender_id = get_id(args, "id")?;

    let query = match method.as_slice() {
        b"ping" => Query::Ping { sender_id },
        b"find_node" => Query::FindNode {
            sender_id,
            target: get_id(args, "target")?,
        },
        b"get_peers" => Query::GetPeers {
            sender_id,
            info_hash: get_id(args, "info_hash")?,
            noseed: get_optional_flag(args, "noseed"),
            scrape: get_optional_flag(args, "scrape"),
        },
        b"announce_peer" => {
            let mut token_bytes = [0u8; 20];
            let raw = get_bytes(args, "token")?;
            if raw.len() != 20 {
                return Err(MalformedMessage::BadCompactLength {
                    expected: 20,
                    got: raw.len(),
                });
            }
            token_bytes.copy_from_slice(raw);
            Query::AnnouncePeer {
                sender_id,
                info_hash: get_id(args, "info_hash")?,
                port: get_int(args, "port").unwrap_or(0) as u16,
                token: Token::from_bytes(token_bytes),
                implied_port: get_optional_flag(args, "implied_port"),
                seed: get_optional_flag(args, "seed"),
            }
        }
        other => {
            return Err(MalformedMessage::UnknownMethod(
                String::from_utf8_lossy(other).into_owned(),
            ))
        }
    };

    Ok(Message::Query { transaction_id, query })
}

/// Response decoding needs the originating query's method to know the
/// response shape (spec.md 4.7: "implicitly known through the transaction
/// id"); the caller supplies it after an outstanding-transaction lookup.
pub fn decode_response_body(top: &Dict, method: &str) -> Result<Response, MalformedMessage> {
    let r = as_dict(get(top, "r")?, "r")?;
    let responder_id = get_id(r, "id")?;

    Ok(match method {
        "ping" => Response::Ping { responder_id },
        "find_node" => Response::FindNode {
            responder_id,
            nodes: decode_compact_node_list(get_bytes(r, "nodes")?)?,
        },
        "get_peers" => {
            let mut token_bytes = [0u8; 20];
            let raw = get_bytes(r, "token")?;
            if raw.len() != 20 {
                return Err(MalformedMessage::BadCompactLength {
                    expected: 20,
                    got: raw.len(),
                });
            }
            token_bytes.copy_from_slice(raw);
            let result = if let Ok(values) = get_bytes(r, "values") {
                GetPeersResult::Values(
                    decode_compact_peer_list(values)?
                        .into_iter()
                        .map(|(addr, port)| crate::domain::entities::Peer::new(addr, port, false))
                        .collect(),
                )
            } else if let Ok(nodes) = get_bytes(r, "nodes") {
                GetPeersResult::Nodes(decode_compact_node_list(nodes)?)
            } else {
                return Err(MalformedMessage::MissingKey("values|nodes"));
            };
            Response::GetPeers {
                responder_id,
                token: Token::from_bytes(token_bytes),
                result,
            }
        }
        "announce_peer" => Response::AnnouncePeer { responder_id },
        other => return Err(MalformedMessage::UnknownMethod(other.to_string())),
    })
}

fn decode_response(top: &Dict, transaction_id: TransactionId) -> Result<Message, MalformedMessage> {
    // Defer body decoding: its shape depends on the originating query's
    // method, known only after an outstanding-transaction lookup.
    let _ = as_dict(get(top, "r")?, "r")?;
    Ok(Message::PendingResponse {
        transaction_id,
        raw: top.clone(),
    })
}

fn decode_error(top: &Dict, transaction_id: TransactionId) -> Result<Message, MalformedMessage> {
    let e = match get(top, "e")? {
        Value::List(items) => items,
        _ => return Err(MalformedMessage::WrongType("e")),
    };
    if e.len() != 2 {
        return Err(MalformedMessage::WrongType("e"));
    }
    let code = match &e[0] {
        Value::Int(201) => ErrorCode::Generic,
        Value::Int(202) => ErrorCode::Server,
        Value::Int(203) => ErrorCode::Protocol,
        Value::Int(204) => ErrorCode::UnknownMethod,
        _ => ErrorCode::Generic,
    };
    let message = match &e[1] {
        Value::Bytes(b) => String::from_utf8_lossy(b).into_owned(),
        _ => String::new(),
    };
    Ok(Message::Error {
        transaction_id,
        error: KrpcError { code, message },
    })
}

fn dict(pairs: Vec<(&'static str, Value)>) -> Value {
    let mut d: Dict = HashMap::new();
    for (k, v) in pairs {
        d.insert(k.as_bytes().to_vec(), v);
    }
    Value::Dict(d)
}

fn bytes(b: &[u8]) -> Value {
    Value::Bytes(b.to_vec())
}

/// Encode an outbound query, per spec.md 4.7 ("Query").
pub fn encode_query(transaction_id: &[u8], query: &Query) -> Vec<u8> {
    let mut args = vec![("id", bytes(query.sender_id().as_bytes()))];
    match query {
        Query::Ping { .. } => {}
        Query::FindNode { target, .. } => args.push(("target", bytes(target.as_bytes()))),
        Query::GetPeers { info_hash, noseed, scrape, .. } => {
            args.push(("info_hash", bytes(info_hash.as_bytes())));
            if *noseed {
                args.push(("noseed", Value::Int(1)));
            }
            if *scrape {
                args.push(("scrape", Value::Int(1)));
            }
        }
        Query::AnnouncePeer {
            info_hash,
            port,
            token,
            implied_port,
            seed,
            ..
        } => {
            args.push(("info_hash", bytes(info_hash.as_bytes())));
            args.push(("port", Value::Int(*port as i64)));
            args.push(("token", bytes(token.as_bytes())));
            if *implied_port {
                args.push(("implied_port", Value::Int(1)));
            }
            if *seed {
                args.push(("seed", Value::Int(1)));
            }
        }
    }

    let top = dict(vec![
        ("t", bytes(transaction_id)),
        ("y", bytes(b"q")),
        ("q", bytes(query.method_name().as_bytes())),
        ("a", dict(args)),
    ]);
    serde_bencode::to_bytes(&top).expect("Value encoding is infallible")
}

/// Encode an outbound response, per spec.md 4.7 ("Response").
pub fn encode_response(transaction_id: &[u8], response: &Response) -> Vec<u8> {
    let mut r = vec![("id", bytes(response.responder_id().as_bytes()))];
    match response {
        Response::Ping { .. } => {}
        Response::FindNode { nodes, .. } => {
            r.push(("nodes", bytes(&encode_compact_node_list(nodes))));
        }
        Response::GetPeers { token, result, .. } => {
            r.push(("token", bytes(token.as_bytes())));
            match result {
                GetPeersResult::Values(peers) => {
                    let flat: Vec<u8> = peers
                        .iter()
                        .flat_map(|p| encode_compact_peer(p.addr, p.port))
                        .collect();
                    r.push(("values", bytes(&flat)));
                }
                GetPeersResult::Nodes(nodes) => {
                    r.push(("nodes", bytes(&encode_compact_node_list(nodes))));
                }
            }
        }
        Response::AnnouncePeer { .. } => {}
    }

    let top = dict(vec![("t", bytes(transaction_id)), ("y", bytes(b"r")), ("r", dict(r))]);
    serde_bencode::to_bytes(&top).expect("Value encoding is infallible")
}

/// Encode an outbound error, per spec.md 4.7 ("Error").
pub fn encode_error(transaction_id: &[u8], error: &KrpcError) -> Vec<u8> {
    let top = dict(vec![
        ("t", bytes(transaction_id)),
        ("y", bytes(b"e")),
        (
            "e",
            Value::List(vec![Value::Int(error.code as i64), bytes(error.message.as_bytes())]),
        ),
    ]);
    serde_bencode::to_bytes(&top).expect("Value encoding is infallible")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::{Node, Peer};
    use crate::domain::token::Token;

    fn id(b: u8) -> Id {
        Id::from_array([b; 20])
    }

    #[test]
    fn ping_query_round_trips() {
        let query = Query::Ping { sender_id: id(1) };
        let wire = encode_query(b"42", &query);
        let decoded = decode(&wire).unwrap();
        match decoded {
            Message::Query { transaction_id, query: q } => {
                assert_eq!(transaction_id, b"42");
                assert_eq!(q, query);
            }
            _ => panic!("expected a query"),
        }
    }

    #[test]
    fn find_node_query_round_trips() {
        let query = Query::FindNode {
            sender_id: id(1),
            target: id(0xff),
        };
        let wire = encode_query(b"aa", &query);
        match decode(&wire).unwrap() {
            Message::Query { query: q, .. } => assert_eq!(q, query),
            _ => panic!("expected a query"),
        }
    }

    #[test]
    fn announce_peer_query_round_trips() {
        let query = Query::AnnouncePeer {
            sender_id: id(3),
            info_hash: id(7),
            port: 6881,
            token: Token::from_bytes([9u8; 20]),
            implied_port: true,
            seed: true,
        };
        let wire = encode_query(b"zz", &query);
        match decode(&wire).unwrap() {
            Message::Query { query: q, .. } => assert_eq!(q, query),
            _ => panic!("expected a query"),
        }
    }

    #[test]
    fn find_node_response_body_round_trips() {
        let nodes = vec![Node::new(id(5), Ipv4Addr::new(1, 2, 3, 4), 6881)];
        let response = Response::FindNode {
            responder_id: id(1),
            nodes: nodes.clone(),
        };
        let wire = encode_response(b"t1", &response);
        let top: Dict = match serde_bencode::from_bytes::<Value>(&wire).unwrap() {
            Value::Dict(d) => d,
            _ => panic!("expected a dict"),
        };
        let decoded = decode_response_body(&top, "find_node").unwrap();
        assert_eq!(decoded, response);
    }

    #[test]
    fn get_peers_values_response_body_round_trips() {
        let response = Response::GetPeers {
            responder_id: id(1),
            token: Token::from_bytes([4u8; 20]),
            result: GetPeersResult::Values(vec![Peer::new(Ipv4Addr::new(9, 9, 9, 9), 80, false)]),
        };
        let wire = encode_response(b"t2", &response);
        let top: Dict = match serde_bencode::from_bytes::<Value>(&wire).unwrap() {
            Value::Dict(d) => d,
            _ => panic!("expected a dict"),
        };
        let decoded = decode_response_body(&top, "get_peers").unwrap();
        assert_eq!(decoded, response);
    }

    #[test]
    fn error_round_trips() {
        let error = KrpcError {
            code: ErrorCode::Protocol,
            message: "Invalid token".to_string(),
        };
        let wire = encode_error(b"e1", &error);
        match decode(&wire).unwrap() {
            Message::Error { error: e, transaction_id } => {
                assert_eq!(transaction_id, b"e1");
                assert_eq!(e, error);
            }
            _ => panic!("expected an error"),
        }
    }

    #[test]
    fn oversized_datagram_is_malformed() {
        let huge = vec![0u8; MAX_DATAGRAM_LEN + 1];
        assert!(matches!(decode(&huge), Err(MalformedMessage::DatagramTooLarge(_))));
    }

    #[test]
    fn non_dict_top_level_is_malformed() {
        let wire = serde_bencode::to_bytes(&Value::Int(5)).unwrap();
        assert!(matches!(decode(&wire), Err(MalformedMessage::NotADict)));
    }
}
