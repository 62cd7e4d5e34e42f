#![no_main]
use libfuzzer_sys::fuzz_target;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

/// One node: bit 0 -> "A", bit 1 -> "B"
fn database(ip_version: u16) -> ipdb::Database {
    let mut data = Vec::new();
    data.extend_from_slice(&1u32.to_be_bytes());
    data.extend_from_slice(&4u32.to_be_bytes());
    data.extend_from_slice(&[0, 1, b'A', 0, 1, b'B']);
    let meta = format!(
        r#"{{"build":0,"ip_version":{},"languages":{{"EN":0}},"node_count":1,"total_size":{},"fields":["name"]}}"#,
        ip_version,
        data.len()
    );
    let mut file = (meta.len() as u32).to_be_bytes().to_vec();
    file.extend_from_slice(meta.as_bytes());
    file.extend_from_slice(&data);
    ipdb::Database::from_bytes(file).unwrap()
}

fuzz_target!(|data: &[u8]| {
    let v4 = database(1);
    let v6 = database(2);

    // Text parsing edge cases
    if let Ok(s) = std::str::from_utf8(data) {
        let _ = v4.lookup(s);
        let _ = v6.lookup(s);
    }

    // Raw address bits
    if data.len() >= 16 {
        let mut octets = [0u8; 16];
        octets.copy_from_slice(&data[..16]);
        let ip = IpAddr::V6(Ipv6Addr::from(octets));
        if let Ok(locator) = v6.search(ip) {
            let _ = v6.get_all_fields(locator);
        }
    }
    if data.len() >= 4 {
        let ip = IpAddr::V4(Ipv4Addr::new(data[0], data[1], data[2], data[3]));
        if let Ok(locator) = v4.search(ip) {
            let _ = v4.get_all_fields(locator);
        }
    }

    // Arbitrary locators must never read out of bounds
    if data.len() >= 4 {
        let locator = u32::from_be_bytes([data[0], data[1], data[2], data[3]]);
        let _ = v6.get_raw(locator);
    }
});
