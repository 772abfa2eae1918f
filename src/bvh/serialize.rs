//! Binary cache format.
//!
//! All values are little endian:
//!
//! ```text
//! magic         b"MBVH"
//! version       u16
//! flags         u16    bit 0: indirect buffer present, bit 1: index buffer present
//! triangles     u32
//! roots         u32
//! per root      u32 node count, then 32 byte node records
//! indirect      u32 length, then u32 entries
//! index         u32 length, then u32 entries
//! ```

use log::debug;

use crate::bvh::mesh_bvh::MeshBvh;
use crate::bvh::node::{NodeBuffer, PackedNode, NODE_STRIDE};
use crate::error::{BvhError, Result};
use crate::geometry::TriangleMesh;

const MAGIC: &[u8; 4] = b"MBVH";
const VERSION: u16 = 1;
const FLAG_INDIRECT: u16 = 1;
const FLAG_INDEX: u16 = 1 << 1;

struct Reader<'a> {
    bytes: &'a [u8],
}

impl<'a> Reader<'a> {
    fn take(&mut self, len: usize) -> Result<&'a [u8]> {
        if self.bytes.len() < len {
            return Err(BvhError::InvalidFormat("unexpected end of data"));
        }
        let (head, tail) = self.bytes.split_at(len);
        self.bytes = tail;
        Ok(head)
    }

    fn u16(&mut self) -> Result<u16> {
        let bytes = self.take(2)?;
        Ok(u16::from_le_bytes([bytes[0], bytes[1]]))
    }

    fn u32(&mut self) -> Result<u32> {
        let bytes = self.take(4)?;
        Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    fn u32_vec(&mut self) -> Result<Vec<u32>> {
        let len = self.u32()? as usize;
        let size = len.checked_mul(4).ok_or(BvhError::InvalidFormat("length overflow"))?;
        let bytes = self.take(size)?;
        Ok(bytes
            .chunks_exact(4)
            .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect())
    }

    fn nodes(&mut self) -> Result<Vec<PackedNode>> {
        let count = self.u32()? as usize;
        let size = count
            .checked_mul(NODE_STRIDE)
            .ok_or(BvhError::InvalidFormat("length overflow"))?;
        let bytes = self.take(size)?;
        Ok(bytes
            .chunks_exact(NODE_STRIDE)
            .map(|c| bytemuck::pod_read_unaligned::<PackedNode>(c).le_to_native())
            .collect())
    }
}

fn write_u32_vec(out: &mut Vec<u8>, values: &[u32]) {
    out.extend_from_slice(&(values.len() as u32).to_le_bytes());
    for value in values {
        out.extend_from_slice(&value.to_le_bytes());
    }
}

impl MeshBvh {
    /// Encodes the hierarchy, and the reordered index buffer of `mesh` when the hierarchy is
    /// not indirect, into a byte buffer that [`MeshBvh::deserialize`] can restore.
    pub fn serialize(&self, mesh: &TriangleMesh) -> Vec<u8> {
        let index = if self.indirect.is_none() { mesh.indices() } else { None };
        let mut flags = 0;
        if self.indirect.is_some() {
            flags |= FLAG_INDIRECT;
        }
        if index.is_some() {
            flags |= FLAG_INDEX;
        }

        let node_count = self.roots.iter().map(NodeBuffer::len).sum::<usize>();
        let mut out = Vec::with_capacity(24 + node_count * NODE_STRIDE + 16 * self.triangle_count);
        out.extend_from_slice(MAGIC);
        out.extend_from_slice(&VERSION.to_le_bytes());
        out.extend_from_slice(&flags.to_le_bytes());
        out.extend_from_slice(&(self.triangle_count as u32).to_le_bytes());
        out.extend_from_slice(&(self.roots.len() as u32).to_le_bytes());
        for root in &self.roots {
            out.extend_from_slice(&(root.len() as u32).to_le_bytes());
            for record in root.records() {
                out.extend_from_slice(bytemuck::bytes_of(&record.native_to_le()));
            }
        }
        if let Some(indirect) = &self.indirect {
            write_u32_vec(&mut out, indirect);
        }
        if let Some(index) = index {
            write_u32_vec(&mut out, index);
        }
        out
    }

    /// Restores a hierarchy written by [`MeshBvh::serialize`] for `mesh`. The index buffer of
    /// `mesh` is replaced by the serialized one if present.
    ///
    /// # Examples
    /// ```
    /// use mesh_bvh::bvh::{BuildOptions, MeshBvh};
    /// use mesh_bvh::geometry::TriangleMesh;
    ///
    /// let positions = vec![0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 1.0, 1.0, 0.0];
    /// let indices = vec![0, 1, 2, 1, 3, 2];
    /// let mut mesh = TriangleMesh::from_flat(positions.clone(), Some(indices.clone())).unwrap();
    /// let bvh = MeshBvh::build(&mut mesh, &BuildOptions::default()).unwrap();
    /// let bytes = bvh.serialize(&mesh);
    ///
    /// let mut fresh = TriangleMesh::from_flat(positions, Some(indices)).unwrap();
    /// let restored = MeshBvh::deserialize(&bytes, &mut fresh).unwrap();
    /// assert_eq!(restored, bvh);
    /// assert_eq!(fresh, mesh);
    /// ```
    pub fn deserialize(bytes: &[u8], mesh: &mut TriangleMesh) -> Result<MeshBvh> {
        let mut reader = Reader { bytes };
        if reader.take(MAGIC.len())? != MAGIC {
            return Err(BvhError::InvalidFormat("missing magic tag"));
        }
        let version = reader.u16()?;
        if version != VERSION {
            return Err(BvhError::UnsupportedVersion {
                found: version,
                expected: VERSION,
            });
        }
        let flags = reader.u16()?;
        if flags & !(FLAG_INDIRECT | FLAG_INDEX) != 0 {
            return Err(BvhError::InvalidFormat("unknown flags"));
        }

        let triangle_count = reader.u32()? as usize;
        if triangle_count != mesh.triangle_count() {
            return Err(BvhError::TriangleCountMismatch {
                expected: triangle_count,
                found: mesh.triangle_count(),
            });
        }

        let root_count = reader.u32()?;
        let mut roots = Vec::new();
        let mut covered = 0;
        for _ in 0..root_count {
            let nodes = reader.nodes()?;
            let root = NodeBuffer::from_records_checked(nodes, triangle_count)?;
            let range = root.triangle_range();
            if range.start < covered {
                return Err(BvhError::InvalidFormat("roots overlap"));
            }
            covered = range.end;
            roots.push(root);
        }

        let indirect = if flags & FLAG_INDIRECT != 0 {
            let indirect = reader.u32_vec()?;
            if indirect.len() != triangle_count
                || indirect.iter().any(|&t| t as usize >= triangle_count)
            {
                return Err(BvhError::InvalidFormat(
                    "indirect buffer does not match the triangle count",
                ));
            }
            Some(indirect)
        } else {
            None
        };

        let index = if flags & FLAG_INDEX != 0 {
            let index = reader.u32_vec()?;
            if index.len() != triangle_count * 3 {
                return Err(BvhError::InvalidFormat(
                    "index buffer does not match the triangle count",
                ));
            }
            Some(index)
        } else {
            None
        };

        if !reader.bytes.is_empty() {
            return Err(BvhError::InvalidFormat("trailing data"));
        }
        if let Some(index) = index {
            mesh.replace_indices(index)?;
        }

        debug!(
            "restored bvh over {} triangles with {} roots",
            triangle_count,
            roots.len()
        );
        Ok(MeshBvh {
            roots,
            indirect,
            triangle_count,
        })
    }
}
