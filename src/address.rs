use std::net::Ipv4Addr;

use pnet::datalink::MacAddr;

use crate::error::{Error, Result};

// Accepted spellings:
//   00:11:22:33:44:55
//   00-11-22-33-44-55
//   0011.2233.4455
pub fn parse_hw_addr(text: &str) -> Result<MacAddr> {
    let invalid = || Error::InvalidHardwareAddr(text.to_string());
    let bytes = text.as_bytes();
    let mut octets = [0u8; 6];

    match bytes.len() {
        17 => {
            let sep = bytes[2];
            if sep != b':' && sep != b'-' {
                return Err(invalid());
            }
            for (i, octet) in octets.iter_mut().enumerate() {
                let at = i * 3;
                if i > 0 && bytes[at - 1] != sep {
                    return Err(invalid());
                }
                *octet = hex_octet(bytes[at], bytes[at + 1]).ok_or_else(invalid)?;
            }
        }
        14 => {
            for (i, octet) in octets.iter_mut().enumerate() {
                let group = i / 2;
                if group > 0 && i % 2 == 0 && bytes[group * 5 - 1] != b'.' {
                    return Err(invalid());
                }
                let at = group * 5 + (i % 2) * 2;
                *octet = hex_octet(bytes[at], bytes[at + 1]).ok_or_else(invalid)?;
            }
        }
        _ => return Err(invalid()),
    }

    Ok(MacAddr::new(octets[0], octets[1], octets[2], octets[3], octets[4], octets[5]))
}

/// Lowercase, colon separated: the only form ever written to or compared against the store.
pub fn canonical_hw_addr(text: &str) -> Result<String> {
    parse_hw_addr(text).map(|mac| mac.to_string())
}

pub fn parse_proto_addr(text: &str) -> Result<Ipv4Addr> {
    text.parse::<Ipv4Addr>().map_err(|_| Error::InvalidProtocolAddr(text.to_string()))
}

fn hex_octet(hi: u8, lo: u8) -> Option<u8> {
    Some(hex_digit(hi)? << 4 | hex_digit(lo)?)
}

fn hex_digit(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'a'..=b'f' => Some(c - b'a' + 10),
        b'A'..=b'F' => Some(c - b'A' + 10),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn separators_canonicalize_identically() {
        let want = "00:11:22:aa:bb:cc";
        assert_eq!(canonical_hw_addr("00:11:22:aa:bb:cc").unwrap(), want);
        assert_eq!(canonical_hw_addr("00-11-22-AA-BB-CC").unwrap(), want);
        assert_eq!(canonical_hw_addr("0011.22aA.BbcC").unwrap(), want);
    }

    #[test]
    fn rejects_malformed_hw_addr() {
        for text in [
            "",
            "00F11:22:33:44:55",
            "00:11:22:33:44",
            "00:11:22:33:44:55:66",
            "00:11-22:33:44:55",
            "0:11:22:33:44:555",
            "00:11:22:33:44:5g",
            "+0:11:22:33:44:55",
            "0011.2233-4455",
            "not-a-mac-address",
        ] {
            let err = parse_hw_addr(text).unwrap_err();
            assert!(matches!(err, Error::InvalidHardwareAddr(ref t) if t == text), "{text:?} parsed");
        }
    }

    #[test]
    fn proto_addr() {
        assert_eq!(parse_proto_addr("1.2.3.4").unwrap(), Ipv4Addr::new(1, 2, 3, 4));
        assert!(parse_proto_addr("not-an-ip").unwrap_err().is_validation());
        assert!(parse_proto_addr("::1").is_err());
        assert!(parse_proto_addr("1.2.3.256").is_err());
    }
}
