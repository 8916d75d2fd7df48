//! Wire format of the lending ledger contract.
//!
//! Topic constants are the keccak-256 of the event signatures; selectors are
//! the first four bytes of the keccak-256 of the function signatures. Decoding
//! is word-at-a-time over the 32-byte ABI layout; anything that does not match
//! the expected shape is rejected here and never reaches the reconciler.

use crate::domain::{Address, EventKind, EventPayload, LoanId, RawAmount, TimeSec};
use crate::gateway::RawLog;
use primitive_types::U256;
use thiserror::Error;

/// `LoanCreated(uint256 indexed loanId, address indexed lender, address
/// indexed borrower, address token, uint256 principal, uint256
/// interestRateBps, uint256 createdAt)`
pub const LOAN_CREATED_TOPIC: &str =
    "0x67fb8b63cbfe13ac20127175c9aa9bc5e28d9086e372b3f61d6d8fc7f52ee561";

/// `LoanRepaid(uint256 indexed loanId, address indexed lender, address
/// indexed borrower, uint256 amount, uint256 principalPaid, uint256
/// interestPaid, uint256 paidAt)`
pub const LOAN_REPAID_TOPIC: &str =
    "0xfa7532f9cc7558c7826752627bfdddc502168680a0af33f097d9ce5122534e4c";

/// `LoanForgiven(uint256 indexed loanId, address indexed lender, address
/// indexed borrower, uint256 principalForgiven)`
pub const LOAN_FORGIVEN_TOPIC: &str =
    "0x7128b8299599e740f0c1534f248e7cf428f67ed3343830422f9ebf38f22601ca";

/// `LoanNFTTransferred(uint256 indexed loanId, address indexed from, address
/// indexed to)`
pub const LOAN_NFT_TRANSFERRED_TOPIC: &str =
    "0xb25cecad711f7d13eaa73f99ef958a19c63c6ce60e4b985d71161280bbf50d35";

/// `CreditLineUpdated(address indexed lender, address indexed borrower,
/// address indexed token, uint256 creditLimit, uint256 minAprBps, uint256
/// maxAprBps, uint256 originationFeeBps)`
pub const CREDIT_LINE_UPDATED_TOPIC: &str =
    "0x2aa3b2fb0e6cc6afc213f7c47be8eba4186b89887cb444def7a51b96c211cd1b";

/// `balanceOf(address)`
pub const BALANCE_OF_SELECTOR: [u8; 4] = [0x70, 0xa0, 0x82, 0x31];

/// `poolBalanceOf(address)`
pub const POOL_BALANCE_OF_SELECTOR: [u8; 4] = [0x01, 0xe0, 0x4e, 0x4e];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("unknown event topic: {0}")]
    UnknownTopic(String),
    #[error("log is missing topic {0}")]
    MissingTopic(usize),
    #[error("log data too short: wanted word {0}")]
    MissingWord(usize),
    #[error("invalid hex: {0}")]
    InvalidHex(String),
    #[error("value out of range for {0}")]
    OutOfRange(&'static str),
}

/// Signature topic for an event kind.
pub fn topic_for_kind(kind: EventKind) -> &'static str {
    match kind {
        EventKind::LoanCreated => LOAN_CREATED_TOPIC,
        EventKind::LoanRepaid => LOAN_REPAID_TOPIC,
        EventKind::LoanForgiven => LOAN_FORGIVEN_TOPIC,
        EventKind::LoanNftTransferred => LOAN_NFT_TRANSFERRED_TOPIC,
        EventKind::CreditLineUpdated => CREDIT_LINE_UPDATED_TOPIC,
    }
}

/// Event kind for a signature topic, if known.
pub fn kind_for_topic(topic: &str) -> Option<EventKind> {
    match topic {
        LOAN_CREATED_TOPIC => Some(EventKind::LoanCreated),
        LOAN_REPAID_TOPIC => Some(EventKind::LoanRepaid),
        LOAN_FORGIVEN_TOPIC => Some(EventKind::LoanForgiven),
        LOAN_NFT_TRANSFERRED_TOPIC => Some(EventKind::LoanNftTransferred),
        CREDIT_LINE_UPDATED_TOPIC => Some(EventKind::CreditLineUpdated),
        _ => None,
    }
}

/// An address left-padded into a 32-byte topic word.
pub fn address_topic(address: &Address) -> String {
    format!("0x{:0>64}", address.hex_digits())
}

/// Validate a raw log into a typed event payload.
pub fn decode_event(raw: &RawLog) -> Result<EventPayload, DecodeError> {
    let topic0 = raw.topics.first().ok_or(DecodeError::MissingTopic(0))?;
    let kind =
        kind_for_topic(topic0).ok_or_else(|| DecodeError::UnknownTopic(topic0.clone()))?;
    let data = decode_hex(&raw.data)?;

    match kind {
        EventKind::LoanCreated => Ok(EventPayload::LoanCreated {
            loan_id: LoanId::new(topic_u64(&raw.topics, 1)?),
            lender: topic_address(&raw.topics, 2)?,
            borrower: topic_address(&raw.topics, 3)?,
            token: word_address(&data, 0)?,
            principal: RawAmount::new(word_u256(&data, 1)?),
            interest_rate_bps: word_u32(&data, 2)?,
            created_at: word_time(&data, 3)?,
        }),
        EventKind::LoanRepaid => Ok(EventPayload::LoanRepaid {
            loan_id: LoanId::new(topic_u64(&raw.topics, 1)?),
            lender: topic_address(&raw.topics, 2)?,
            borrower: topic_address(&raw.topics, 3)?,
            amount: RawAmount::new(word_u256(&data, 0)?),
            principal_paid: RawAmount::new(word_u256(&data, 1)?),
            interest_paid: RawAmount::new(word_u256(&data, 2)?),
            paid_at: word_time(&data, 3)?,
        }),
        EventKind::LoanForgiven => Ok(EventPayload::LoanForgiven {
            loan_id: LoanId::new(topic_u64(&raw.topics, 1)?),
            lender: topic_address(&raw.topics, 2)?,
            borrower: topic_address(&raw.topics, 3)?,
            principal_forgiven: RawAmount::new(word_u256(&data, 0)?),
        }),
        EventKind::LoanNftTransferred => Ok(EventPayload::LoanNftTransferred {
            loan_id: LoanId::new(topic_u64(&raw.topics, 1)?),
            from: topic_address(&raw.topics, 2)?,
            to: topic_address(&raw.topics, 3)?,
        }),
        EventKind::CreditLineUpdated => Ok(EventPayload::CreditLineUpdated {
            lender: topic_address(&raw.topics, 1)?,
            borrower: topic_address(&raw.topics, 2)?,
            token: topic_address(&raw.topics, 3)?,
            credit_limit: RawAmount::new(word_u256(&data, 0)?),
            min_apr_bps: word_u32(&data, 1)?,
            max_apr_bps: word_u32(&data, 2)?,
            origination_fee_bps: word_u32(&data, 3)?,
        }),
    }
}

/// Decode the 32-byte balance word an `eth_call` returns.
pub fn decode_amount_return(bytes: &[u8]) -> Result<RawAmount, DecodeError> {
    if bytes.len() < 32 {
        return Err(DecodeError::MissingWord(0));
    }
    Ok(RawAmount::new(U256::from_big_endian(&bytes[..32])))
}

/// Calldata for `balanceOf(address)`.
pub fn encode_balance_of(account: &Address) -> Result<Vec<u8>, DecodeError> {
    encode_address_call(BALANCE_OF_SELECTOR, account)
}

/// Calldata for `poolBalanceOf(address)`.
pub fn encode_pool_balance_of(account: &Address) -> Result<Vec<u8>, DecodeError> {
    encode_address_call(POOL_BALANCE_OF_SELECTOR, account)
}

fn encode_address_call(selector: [u8; 4], account: &Address) -> Result<Vec<u8>, DecodeError> {
    let mut calldata = selector.to_vec();
    let digits = account.hex_digits();
    let raw = hex::decode(digits).map_err(|_| DecodeError::InvalidHex(digits.to_string()))?;
    if raw.len() > 20 {
        return Err(DecodeError::OutOfRange("address"));
    }
    let mut word = [0u8; 32];
    word[32 - raw.len()..].copy_from_slice(&raw);
    calldata.extend_from_slice(&word);
    Ok(calldata)
}

fn decode_hex(s: &str) -> Result<Vec<u8>, DecodeError> {
    let digits = s.strip_prefix("0x").unwrap_or(s);
    hex::decode(digits).map_err(|_| DecodeError::InvalidHex(s.to_string()))
}

fn topic_word(topics: &[String], index: usize) -> Result<U256, DecodeError> {
    let topic = topics.get(index).ok_or(DecodeError::MissingTopic(index))?;
    let bytes = decode_hex(topic)?;
    if bytes.len() != 32 {
        return Err(DecodeError::InvalidHex(topic.clone()));
    }
    Ok(U256::from_big_endian(&bytes))
}

fn topic_u64(topics: &[String], index: usize) -> Result<u64, DecodeError> {
    let value = topic_word(topics, index)?;
    if value.bits() > 64 {
        return Err(DecodeError::OutOfRange("u64 topic"));
    }
    Ok(value.as_u64())
}

fn topic_address(topics: &[String], index: usize) -> Result<Address, DecodeError> {
    let topic = topics.get(index).ok_or(DecodeError::MissingTopic(index))?;
    let bytes = decode_hex(topic)?;
    if bytes.len() != 32 {
        return Err(DecodeError::InvalidHex(topic.clone()));
    }
    Ok(Address::new(format!("0x{}", hex::encode(&bytes[12..]))))
}

fn word(data: &[u8], index: usize) -> Result<&[u8], DecodeError> {
    let start = index * 32;
    data.get(start..start + 32)
        .ok_or(DecodeError::MissingWord(index))
}

fn word_u256(data: &[u8], index: usize) -> Result<U256, DecodeError> {
    Ok(U256::from_big_endian(word(data, index)?))
}

fn word_u32(data: &[u8], index: usize) -> Result<u32, DecodeError> {
    let value = word_u256(data, index)?;
    if value > U256::from(u32::MAX) {
        return Err(DecodeError::OutOfRange("u32 word"));
    }
    Ok(value.as_u32())
}

fn word_address(data: &[u8], index: usize) -> Result<Address, DecodeError> {
    let bytes = word(data, index)?;
    Ok(Address::new(format!("0x{}", hex::encode(&bytes[12..]))))
}

fn word_time(data: &[u8], index: usize) -> Result<TimeSec, DecodeError> {
    let value = word_u256(data, index)?;
    if value > U256::from(i64::MAX as u64) {
        return Err(DecodeError::OutOfRange("timestamp word"));
    }
    Ok(TimeSec::new(value.as_u64() as i64))
}

/// A U256 as a 0x-prefixed 32-byte hex word (log/test fixtures).
pub fn u256_topic(value: U256) -> String {
    let mut word = [0u8; 32];
    value.to_big_endian(&mut word);
    format!("0x{}", hex::encode(word))
}

/// Concatenate words into a 0x-prefixed data blob (log/test fixtures).
pub fn encode_data_words(words: &[U256]) -> String {
    let mut out = String::with_capacity(2 + words.len() * 64);
    out.push_str("0x");
    let mut word = [0u8; 32];
    for w in words {
        w.to_big_endian(&mut word);
        out.push_str(&hex::encode(word));
    }
    out
}

/// Address as a U256 word value (log/test fixtures).
pub fn address_word(address: &Address) -> Result<U256, DecodeError> {
    let digits = address.hex_digits();
    let raw = hex::decode(digits).map_err(|_| DecodeError::InvalidHex(digits.to_string()))?;
    if raw.len() > 32 {
        return Err(DecodeError::OutOfRange("address"));
    }
    let mut word = [0u8; 32];
    word[32 - raw.len()..].copy_from_slice(&raw);
    Ok(U256::from_big_endian(&word))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::TxHash;

    fn addr(s: &str) -> Address {
        Address::new(s)
    }

    fn make_loan_created_log() -> RawLog {
        RawLog {
            address: addr("0xcccccccccccccccccccccccccccccccccccccccc"),
            topics: vec![
                LOAN_CREATED_TOPIC.to_string(),
                u256_topic(U256::from(7u64)),
                address_topic(&addr("0xaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa")),
                address_topic(&addr("0xbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb")),
            ],
            data: encode_data_words(&[
                address_word(&addr("0xdddddddddddddddddddddddddddddddddddddddd")).unwrap(),
                U256::from(1_000_000u64),
                U256::from(500u64),
                U256::from(1_700_000_000u64),
            ]),
            block_number: 100,
            log_index: 1,
            tx_hash: TxHash::new("0x01"),
        }
    }

    #[test]
    fn test_decode_loan_created() {
        let payload = decode_event(&make_loan_created_log()).unwrap();
        match payload {
            EventPayload::LoanCreated {
                loan_id,
                lender,
                borrower,
                token,
                principal,
                interest_rate_bps,
                created_at,
            } => {
                assert_eq!(loan_id, LoanId::new(7));
                assert_eq!(lender, addr("0xaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa"));
                assert_eq!(borrower, addr("0xbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb"));
                assert_eq!(token, addr("0xdddddddddddddddddddddddddddddddddddddddd"));
                assert_eq!(principal, RawAmount::from(1_000_000u64));
                assert_eq!(interest_rate_bps, 500);
                assert_eq!(created_at, TimeSec::new(1_700_000_000));
            }
            other => panic!("wrong variant: {:?}", other),
        }
    }

    #[test]
    fn test_decode_unknown_topic_rejected() {
        let mut log = make_loan_created_log();
        log.topics[0] = u256_topic(U256::from(0xdeadu64));
        assert!(matches!(
            decode_event(&log),
            Err(DecodeError::UnknownTopic(_))
        ));
    }

    #[test]
    fn test_decode_truncated_data_rejected() {
        let mut log = make_loan_created_log();
        log.data = encode_data_words(&[U256::from(1u64)]);
        assert!(matches!(
            decode_event(&log),
            Err(DecodeError::MissingWord(_))
        ));
    }

    #[test]
    fn test_decode_missing_indexed_topic_rejected() {
        let mut log = make_loan_created_log();
        log.topics.truncate(2);
        assert!(matches!(
            decode_event(&log),
            Err(DecodeError::MissingTopic(2))
        ));
    }

    #[test]
    fn test_address_topic_round_trip() {
        let a = addr("0xbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb");
        let topics = vec!["0x00".to_string(), address_topic(&a)];
        assert_eq!(topic_address(&topics, 1).unwrap(), a);
    }

    #[test]
    fn test_encode_balance_of_layout() {
        let calldata =
            encode_balance_of(&addr("0xbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb")).unwrap();
        assert_eq!(calldata.len(), 36);
        assert_eq!(&calldata[..4], &BALANCE_OF_SELECTOR);
        assert_eq!(&calldata[4..16], &[0u8; 12]);
        assert_eq!(&calldata[16..], &[0xbbu8; 20]);
    }

    #[test]
    fn test_decode_amount_return() {
        let mut bytes = [0u8; 32];
        bytes[31] = 0x2a;
        assert_eq!(
            decode_amount_return(&bytes).unwrap(),
            RawAmount::from(42u64)
        );
        assert!(decode_amount_return(&[0u8; 4]).is_err());
    }

    #[test]
    fn test_loan_id_past_u64_rejected() {
        let mut log = make_loan_created_log();
        log.topics[1] = u256_topic(U256::from(u128::MAX));
        assert!(matches!(
            decode_event(&log),
            Err(DecodeError::OutOfRange(_))
        ));
    }
}
