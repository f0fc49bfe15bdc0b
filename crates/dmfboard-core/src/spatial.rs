use rstar::{RTree, RTreeObject, AABB};

use crate::board::BoardElectrode;
use crate::geometry::BBox;

/// An entry in the R-tree spatial index, referencing an electrode by its
/// position in a flattened electrode list.
#[derive(Debug, Clone)]
pub struct SpatialEntry {
    /// Index into the flattened electrode list.
    pub electrode_index: usize,
    /// Bounding box of the electrode's board-frame polygon.
    pub bbox: BBox,
}

impl RTreeObject for SpatialEntry {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_corners(
            [self.bbox.min.x, self.bbox.min.y],
            [self.bbox.max.x, self.bbox.max.y],
        )
    }
}

/// Spatial index for neighbour discovery between electrodes.
pub struct SpatialIndex {
    tree: RTree<SpatialEntry>,
}

impl SpatialIndex {
    /// Build the index from a list of electrode bounding boxes.
    pub fn build(entries: Vec<SpatialEntry>) -> Self {
        Self {
            tree: RTree::bulk_load(entries),
        }
    }

    /// Index every electrode of a flattened board.
    pub fn from_electrodes(electrodes: &[BoardElectrode]) -> Self {
        Self::build(
            electrodes
                .iter()
                .enumerate()
                .filter_map(|(i, e)| {
                    e.points.bbox().map(|bbox| SpatialEntry {
                        electrode_index: i,
                        bbox,
                    })
                })
                .collect(),
        )
    }

    /// Find all entries whose bounding box meets `bbox`.
    pub fn query_bbox(&self, bbox: &BBox) -> Vec<&SpatialEntry> {
        let envelope = AABB::from_corners([bbox.min.x, bbox.min.y], [bbox.max.x, bbox.max.y]);
        self.tree
            .locate_in_envelope_intersecting(&envelope)
            .collect()
    }

    /// Indices of electrodes within `distance` of `bbox`, sorted ascending.
    pub fn neighbours(&self, bbox: &BBox, distance: f64) -> Vec<usize> {
        let mut hits: Vec<usize> = self
            .query_bbox(&bbox.expand(distance))
            .into_iter()
            .map(|e| e.electrode_index)
            .collect();
        hits.sort_unstable();
        hits
    }

    /// Number of entries in the index.
    pub fn len(&self) -> usize {
        self.tree.size()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Point;

    #[test]
    fn test_spatial_query() {
        let entries = vec![
            SpatialEntry {
                electrode_index: 0,
                bbox: BBox::new(Point::new(0.0, 0.0), Point::new(10.0, 10.0)),
            },
            SpatialEntry {
                electrode_index: 1,
                bbox: BBox::new(Point::new(20.0, 20.0), Point::new(30.0, 30.0)),
            },
        ];
        let index = SpatialIndex::build(entries);

        let corner = BBox::new(Point::new(5.0, 5.0), Point::new(5.0, 5.0));
        let results = index.query_bbox(&corner);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].electrode_index, 0);

        let corner = BBox::new(Point::new(25.0, 25.0), Point::new(25.0, 25.0));
        let results = index.query_bbox(&corner);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].electrode_index, 1);

        let window = BBox::new(Point::new(-5.0, -5.0), Point::new(15.0, 15.0));
        assert_eq!(index.query_bbox(&window).len(), 1);
    }

    #[test]
    fn test_neighbours_touching_boxes() {
        let index = SpatialIndex::build(vec![
            SpatialEntry {
                electrode_index: 3,
                bbox: BBox::new(Point::new(1.0, 0.0), Point::new(2.0, 1.0)),
            },
            SpatialEntry {
                electrode_index: 1,
                bbox: BBox::new(Point::new(0.0, 0.0), Point::new(1.0, 1.0)),
            },
            SpatialEntry {
                electrode_index: 2,
                bbox: BBox::new(Point::new(5.0, 5.0), Point::new(6.0, 6.0)),
            },
        ]);
        let query = BBox::new(Point::new(0.0, 0.0), Point::new(1.0, 1.0));
        assert_eq!(index.neighbours(&query, 1e-7), vec![1, 3]);
        assert_eq!(index.len(), 3);
    }
}
