use std::fmt;

use crate::codec::WireReader;
use crate::error::Result;

/// Node feature matrix of shape `[num_nodes, feature_size]`, row-major.
#[derive(Clone, PartialEq)]
pub struct NodeFeatures {
    data: Vec<f32>,
    feature_size: usize,
}

impl NodeFeatures {
    /// Rows in the matrix.
    pub fn num_nodes(&self) -> usize {
        if self.feature_size == 0 {
            0
        } else {
            self.data.len() / self.feature_size
        }
    }

    /// Width of each feature row.
    pub fn feature_size(&self) -> usize {
        self.feature_size
    }

    /// The feature row of node `index` (local numbering).
    pub fn row(&self, index: usize) -> &[f32] {
        let start = index * self.feature_size;
        &self.data[start..start + self.feature_size]
    }

    /// The full row-major backing buffer.
    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }
}

/// Edge index matrix of shape `[2, num_edges]`.
///
/// Row 0 holds source indices, row 1 destination indices. Entries are local
/// node indices into the batch numbering, not global identifiers.
#[derive(Clone, PartialEq, Eq)]
pub struct EdgeIndex {
    data: Vec<i64>,
    num_edges: usize,
}

impl EdgeIndex {
    /// Columns in the matrix.
    pub fn num_edges(&self) -> usize {
        self.num_edges
    }

    /// Row 0: source index of each edge.
    pub fn sources(&self) -> &[i64] {
        &self.data[..self.num_edges]
    }

    /// Row 1: destination index of each edge.
    pub fn targets(&self) -> &[i64] {
        &self.data[self.num_edges..]
    }

    /// The full row-major backing buffer.
    pub fn as_slice(&self) -> &[i64] {
        &self.data
    }
}

/// One decoded training/evaluation mini-batch.
///
/// Node ids are relabelled to consecutive local indices starting at 0, and
/// the first `num_seeds` positions of `node_ids` (and of the feature and
/// label rows) are the seed nodes that produced the batch, in order.
#[derive(Clone, PartialEq)]
pub struct GraphBatch {
    /// Node features, `[num_nodes, feature_size]`.
    pub node_features: NodeFeatures,
    /// Node labels, length `num_nodes`. Transmitted unsigned, reinterpreted
    /// as signed for the consumer.
    pub node_labels: Vec<i64>,
    /// Edge endpoints, `[2, num_edges]`, local indices.
    pub edge_index: EdgeIndex,
    /// Original global node identifiers, length `num_nodes`.
    pub node_ids: Vec<u64>,
    /// Seed nodes used to build this batch.
    pub num_seeds: usize,
}

impl GraphBatch {
    /// Decode a batch from a `Next` response payload.
    ///
    /// Layout: `num_nodes ∥ num_edges ∥ num_seeds ∥ feature_size` header
    /// (u64 each), then features (f32), labels (u64), edge index (u64,
    /// row-major) and node ids (u64). The payload must be exactly exhausted;
    /// short or leftover bytes fail the decode.
    pub fn decode(payload: &[u8]) -> Result<Self> {
        let mut reader = WireReader::new(payload);

        let num_nodes = reader.u64()?;
        let num_edges = reader.u64()?;
        let num_seeds = reader.u64()?;
        let feature_size = reader.u64()?;

        let features = reader.f32_vec(num_nodes.saturating_mul(feature_size))?;
        let node_labels: Vec<i64> = reader
            .u64_vec(num_nodes)?
            .into_iter()
            .map(|v| v as i64)
            .collect();
        let edges: Vec<i64> = reader
            .u64_vec(num_edges.saturating_mul(2))?
            .into_iter()
            .map(|v| v as i64)
            .collect();
        let node_ids = reader.u64_vec(num_nodes)?;
        reader.finish()?;

        Ok(Self {
            node_features: NodeFeatures {
                data: features,
                feature_size: feature_size as usize,
            },
            node_labels,
            edge_index: EdgeIndex {
                data: edges,
                num_edges: num_edges as usize,
            },
            node_ids,
            num_seeds: num_seeds as usize,
        })
    }

    /// Nodes in this batch.
    pub fn num_nodes(&self) -> usize {
        self.node_ids.len()
    }

    /// Edges in this batch.
    pub fn num_edges(&self) -> usize {
        self.edge_index.num_edges()
    }

    /// Width of each feature row.
    pub fn feature_size(&self) -> usize {
        self.node_features.feature_size()
    }
}

// Shapes only; batches can hold millions of values.
impl fmt::Debug for GraphBatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GraphBatch")
            .field(
                "node_features",
                &format_args!("[{}, {}]", self.num_nodes(), self.feature_size()),
            )
            .field("node_labels", &format_args!("[{}]", self.node_labels.len()))
            .field(
                "edge_index",
                &format_args!("[2, {}]", self.edge_index.num_edges()),
            )
            .field("node_ids", &format_args!("[{}]", self.node_ids.len()))
            .field("num_seeds", &self.num_seeds)
            .field("feature_size", &self.feature_size())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use bytes::BytesMut;

    use super::*;
    use crate::codec::{put_u64, put_u64_slice};
    use crate::error::WireError;

    fn synthetic_payload() -> BytesMut {
        // 3 nodes, 2 edges, 1 seed, 4 features per node.
        let mut buf = BytesMut::new();
        put_u64(&mut buf, 3);
        put_u64(&mut buf, 2);
        put_u64(&mut buf, 1);
        put_u64(&mut buf, 4);
        for i in 0..12 {
            buf.extend_from_slice(&(i as f32 * 0.5).to_le_bytes());
        }
        put_u64_slice(&mut buf, &[7, 8, u64::MAX]); // labels, last is -1 signed
        put_u64_slice(&mut buf, &[0, 1, 1, 2]); // edge index rows
        put_u64_slice(&mut buf, &[900, 901, 902]); // global node ids
        buf
    }

    #[test]
    fn decode_synthetic_batch() {
        let batch = GraphBatch::decode(&synthetic_payload()).unwrap();

        assert_eq!(batch.num_nodes(), 3);
        assert_eq!(batch.num_edges(), 2);
        assert_eq!(batch.num_seeds, 1);
        assert_eq!(batch.feature_size(), 4);

        assert_eq!(batch.node_features.num_nodes(), 3);
        assert_eq!(batch.node_features.row(0), &[0.0, 0.5, 1.0, 1.5]);
        assert_eq!(batch.node_features.row(2), &[4.0, 4.5, 5.0, 5.5]);

        assert_eq!(batch.node_labels, vec![7, 8, -1]);
        assert_eq!(batch.edge_index.sources(), &[0, 1]);
        assert_eq!(batch.edge_index.targets(), &[1, 2]);
        assert_eq!(batch.node_ids, vec![900, 901, 902]);
    }

    #[test]
    fn decode_empty_edge_set() {
        let mut buf = BytesMut::new();
        put_u64(&mut buf, 1);
        put_u64(&mut buf, 0);
        put_u64(&mut buf, 1);
        put_u64(&mut buf, 2);
        buf.extend_from_slice(&1.0f32.to_le_bytes());
        buf.extend_from_slice(&2.0f32.to_le_bytes());
        put_u64_slice(&mut buf, &[3]);
        put_u64_slice(&mut buf, &[55]);

        let batch = GraphBatch::decode(&buf).unwrap();
        assert_eq!(batch.num_edges(), 0);
        assert!(batch.edge_index.sources().is_empty());
        assert_eq!(batch.node_ids, vec![55]);
    }

    #[test]
    fn truncated_payload_fails() {
        let mut payload = synthetic_payload();
        payload.truncate(payload.len() - 1);
        assert!(matches!(
            GraphBatch::decode(&payload).unwrap_err(),
            WireError::Underrun { .. }
        ));
    }

    #[test]
    fn trailing_bytes_fail() {
        let mut payload = synthetic_payload();
        payload.extend_from_slice(&[0u8; 3]);
        assert!(matches!(
            GraphBatch::decode(&payload).unwrap_err(),
            WireError::TrailingBytes(3)
        ));
    }

    #[test]
    fn header_only_payload_fails() {
        let payload = &synthetic_payload()[..32];
        assert!(GraphBatch::decode(payload).is_err());
    }

    #[test]
    fn oversized_header_counts_fail_before_allocation() {
        let mut buf = BytesMut::new();
        put_u64(&mut buf, u64::MAX); // num_nodes
        put_u64(&mut buf, u64::MAX); // num_edges
        put_u64(&mut buf, 1);
        put_u64(&mut buf, u64::MAX); // feature_size
        assert!(GraphBatch::decode(&buf).is_err());
    }

    #[test]
    fn debug_prints_shapes() {
        let batch = GraphBatch::decode(&synthetic_payload()).unwrap();
        let repr = format!("{batch:?}");
        assert!(repr.contains("[3, 4]"));
        assert!(repr.contains("[2, 2]"));
        assert!(repr.contains("num_seeds: 1"));
    }
}
