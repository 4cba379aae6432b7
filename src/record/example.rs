//! `tf.train.Example` protobuf messages.
//!
//! Declared by hand with `prost` derives instead of generated from
//! `example.proto`/`feature.proto`, so no protoc is needed at build time.
//! Field numbers match TensorFlow's definitions. The feature map is a
//! `BTreeMap`, which makes the encoded bytes of a record deterministic.

use std::collections::BTreeMap;

/// A list of byte strings.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct BytesList {
    #[prost(bytes = "vec", repeated, tag = "1")]
    pub value: Vec<Vec<u8>>,
}

/// A packed list of 32-bit floats.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct FloatList {
    #[prost(float, repeated, tag = "1")]
    pub value: Vec<f32>,
}

/// A packed list of 64-bit integers.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Int64List {
    #[prost(int64, repeated, tag = "1")]
    pub value: Vec<i64>,
}

/// One named value inside an [`Example`].
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Feature {
    #[prost(oneof = "feature::Kind", tags = "1, 2, 3")]
    pub kind: Option<feature::Kind>,
}

pub mod feature {
    /// The typed payload of a [`Feature`](super::Feature).
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum Kind {
        #[prost(message, tag = "1")]
        BytesList(super::BytesList),
        #[prost(message, tag = "2")]
        FloatList(super::FloatList),
        #[prost(message, tag = "3")]
        Int64List(super::Int64List),
    }
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Features {
    #[prost(btree_map = "string, message", tag = "1")]
    pub feature: BTreeMap<String, Feature>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Example {
    #[prost(message, optional, tag = "1")]
    pub features: Option<Features>,
}

impl Feature {
    pub fn bytes(value: Vec<u8>) -> Self {
        Self {
            kind: Some(feature::Kind::BytesList(BytesList { value: vec![value] })),
        }
    }

    pub fn floats(value: Vec<f32>) -> Self {
        Self {
            kind: Some(feature::Kind::FloatList(FloatList { value })),
        }
    }

    pub fn int64s(value: Vec<i64>) -> Self {
        Self {
            kind: Some(feature::Kind::Int64List(Int64List { value })),
        }
    }

    pub fn int64(value: i64) -> Self {
        Self::int64s(vec![value])
    }

    pub fn as_bytes_list(&self) -> Option<&[Vec<u8>]> {
        match &self.kind {
            Some(feature::Kind::BytesList(list)) => Some(&list.value),
            _ => None,
        }
    }

    pub fn as_float_list(&self) -> Option<&[f32]> {
        match &self.kind {
            Some(feature::Kind::FloatList(list)) => Some(&list.value),
            _ => None,
        }
    }

    pub fn as_int64_list(&self) -> Option<&[i64]> {
        match &self.kind {
            Some(feature::Kind::Int64List(list)) => Some(&list.value),
            _ => None,
        }
    }
}

impl Example {
    /// Looks up a feature by key.
    pub fn feature(&self, key: &str) -> Option<&Feature> {
        self.features.as_ref()?.feature.get(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prost::Message;

    #[test]
    fn test_feature_accessors_match_kind() {
        let f = Feature::floats(vec![0.5, 0.25]);
        assert_eq!(f.as_float_list(), Some(&[0.5f32, 0.25][..]));
        assert_eq!(f.as_int64_list(), None);
        assert_eq!(f.as_bytes_list(), None);
    }

    #[test]
    fn test_int64_list_wire_bytes() {
        // Example{features{feature{"k": int64_list{3}}}}
        let mut map = BTreeMap::new();
        map.insert("k".to_string(), Feature::int64(3));
        let example = Example {
            features: Some(Features { feature: map }),
        };
        let bytes = example.encode_to_vec();
        assert_eq!(
            bytes,
            [
                0x0a, 0x0c, // Example.features
                0x0a, 0x0a, // Features.feature map entry
                0x0a, 0x01, b'k', // entry key
                0x12, 0x05, // entry value
                0x1a, 0x03, // Feature.int64_list
                0x0a, 0x01, 0x03, // packed Int64List.value
            ]
        );
        let decoded = Example::decode(bytes.as_slice()).expect("decode");
        assert_eq!(decoded, example);
    }
}
