//! Fixture writer for synthetic IPDB files
//!
//! Builds the on-disk layout (length prefix, JSON metadata, trie nodes,
//! length-prefixed records) from a list of CIDR prefixes. IPv4 databases are
//! written IPv6-shaped, with the IPv4 space hung under `::ffff:0:0/96`.

#![allow(dead_code)]

use serde_json::json;
use std::collections::HashMap;
use std::net::IpAddr;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Child {
    Empty,
    Node(usize),
    Leaf(usize),
}

pub struct Fixture {
    ip_version: u16,
    build: i64,
    languages: Vec<(String, usize)>,
    fields: Vec<String>,
    nodes: Vec<[Child; 2]>,
    records: Vec<String>,
    record_ids: HashMap<String, usize>,
    default_record: Option<String>,
}

impl Fixture {
    fn new(ip_version: u16) -> Self {
        let mut fixture = Fixture {
            ip_version,
            build: 1_700_000_000,
            languages: Vec::new(),
            fields: Vec::new(),
            nodes: vec![[Child::Empty, Child::Empty]],
            records: Vec::new(),
            record_ids: HashMap::new(),
            default_record: None,
        };
        if ip_version == 1 {
            // Pre-build the ::ffff:0:0/96 spine
            let mut node = 0;
            for i in 0..96 {
                node = fixture.descend(node, u8::from(i >= 80));
            }
        }
        fixture
    }

    /// IPv4 database (ip_version 1)
    pub fn ipv4() -> Self {
        Self::new(1)
    }

    /// IPv6 database (ip_version 2)
    pub fn ipv6() -> Self {
        Self::new(2)
    }

    pub fn language(mut self, code: &str, column: usize) -> Self {
        self.languages.push((code.to_string(), column));
        self
    }

    pub fn fields(mut self, fields: &[&str]) -> Self {
        self.fields = fields.iter().map(|f| f.to_string()).collect();
        self
    }

    pub fn build_epoch(mut self, build: i64) -> Self {
        self.build = build;
        self
    }

    /// Record used for every address no prefix covers
    pub fn with_default(mut self, columns: &[&str]) -> Self {
        self.default_record = Some(columns.join("\t"));
        self
    }

    /// Map `cidr` to a record made of `columns`
    pub fn insert(mut self, cidr: &str, columns: &[&str]) -> Self {
        let (addr, len) = cidr.split_once('/').unwrap_or((cidr, ""));
        let ip: IpAddr = addr.parse().expect("fixture address");
        let (octets, full): (Vec<u8>, usize) = match ip {
            IpAddr::V4(v4) => (v4.octets().to_vec(), 32),
            IpAddr::V6(v6) => (v6.octets().to_vec(), 128),
        };
        let len: usize = if len.is_empty() { full } else { len.parse().expect("prefix length") };
        assert!(len > 0, "fixture prefixes must be at least one bit");

        let mut node = if ip.is_ipv4() {
            assert_eq!(self.ip_version, 1, "IPv4 prefix in IPv6 fixture");
            self.ipv4_root()
        } else {
            0
        };

        let bit = |i: usize| (octets[i / 8] >> (7 - (i % 8))) & 1;
        for i in 0..len - 1 {
            node = self.descend(node, bit(i));
        }

        let record = self.record_id(&columns.join("\t"));
        self.nodes[node][bit(len - 1) as usize] = Child::Leaf(record);
        self
    }

    fn ipv4_root(&mut self) -> usize {
        let mut node = 0;
        for i in 0..96 {
            node = self.descend(node, u8::from(i >= 80));
        }
        node
    }

    fn descend(&mut self, node: usize, bit: u8) -> usize {
        match self.nodes[node][bit as usize] {
            Child::Node(next) => next,
            Child::Empty => {
                let next = self.nodes.len();
                self.nodes.push([Child::Empty, Child::Empty]);
                self.nodes[node][bit as usize] = Child::Node(next);
                next
            }
            Child::Leaf(_) => panic!("fixture prefixes must not nest under a leaf"),
        }
    }

    fn record_id(&mut self, record: &str) -> usize {
        if let Some(&id) = self.record_ids.get(record) {
            return id;
        }
        let id = self.records.len();
        self.records.push(record.to_string());
        self.record_ids.insert(record.to_string(), id);
        id
    }

    /// Serialize to IPDB bytes
    ///
    /// Empty children point at the default record if one was set, otherwise
    /// at a sink node whose children point back to itself (never a leaf).
    pub fn build(mut self) -> Vec<u8> {
        let default = self.default_record.take().map(|r| self.record_id(&r));
        let has_empty = self
            .nodes
            .iter()
            .flatten()
            .any(|child| *child == Child::Empty);
        let sink = if has_empty && default.is_none() {
            let sink = self.nodes.len();
            self.nodes.push([Child::Node(sink), Child::Node(sink)]);
            Some(sink)
        } else {
            None
        };

        let node_count = self.nodes.len() as u32;

        let mut record_bytes = Vec::new();
        let mut record_offsets = Vec::new();
        for record in &self.records {
            record_offsets.push(record_bytes.len() as u32);
            record_bytes.extend_from_slice(&(record.len() as u16).to_be_bytes());
            record_bytes.extend_from_slice(record.as_bytes());
        }

        let pointer = |child: Child| -> u32 {
            match child {
                Child::Node(n) => n as u32,
                Child::Leaf(r) => node_count + record_offsets[r],
                Child::Empty => match (default, sink) {
                    (Some(r), _) => node_count + record_offsets[r],
                    (None, Some(s)) => s as u32,
                    (None, None) => unreachable!("empty child without sink"),
                },
            }
        };

        let mut data = Vec::with_capacity(self.nodes.len() * 8 + record_bytes.len());
        for [left, right] in &self.nodes {
            data.extend_from_slice(&pointer(*left).to_be_bytes());
            data.extend_from_slice(&pointer(*right).to_be_bytes());
        }
        data.extend_from_slice(&record_bytes);

        let languages: serde_json::Map<String, serde_json::Value> = self
            .languages
            .iter()
            .map(|(code, column)| (code.clone(), json!(column)))
            .collect();
        let meta = json!({
            "build": self.build,
            "ip_version": self.ip_version,
            "languages": languages,
            "node_count": node_count,
            "total_size": data.len(),
            "fields": self.fields,
        });

        write_file(&serde_json::to_vec(&meta).unwrap(), &data)
    }
}

/// Assemble a file from metadata bytes and a data region
pub fn write_file(meta: &[u8], data: &[u8]) -> Vec<u8> {
    let mut file = (meta.len() as u32).to_be_bytes().to_vec();
    file.extend_from_slice(meta);
    file.extend_from_slice(data);
    file
}

/// Offset of the data region in a fixture file
pub fn data_offset(file: &[u8]) -> usize {
    4 + u32::from_be_bytes([file[0], file[1], file[2], file[3]]) as usize
}

/// Two-language city database used by several test files
///
/// CN block starts at column 0, EN at column 2; fields are country, city.
pub fn sample_ipv4() -> Vec<u8> {
    Fixture::ipv4()
        .language("CN", 0)
        .language("EN", 2)
        .fields(&["country", "city"])
        .insert("1.0.0.0/8", &["澳大利亚", "悉尼", "Australia", "Sydney"])
        .insert("8.8.8.0/24", &["美国", "山景城", "United States", "Mountain View"])
        .insert("114.114.114.114", &["中国", "南京", "China", "Nanjing"])
        .insert("202.96.0.0/12", &["中国", "上海", "China", "Shanghai"])
        .build()
}

/// IPv6 counterpart of [`sample_ipv4`]
pub fn sample_ipv6() -> Vec<u8> {
    Fixture::ipv6()
        .language("CN", 0)
        .language("EN", 2)
        .fields(&["country", "city"])
        .insert("2001:4860::/32", &["美国", "山景城", "United States", "Mountain View"])
        .insert("240e::/20", &["中国", "北京", "China", "Beijing"])
        .insert("::ffff:0:0/96", &["保留", "保留", "Reserved", "Reserved"])
        .build()
}
