//! Smooth node mobility over cubic Bezier paths.
//!
//! Each mobile node follows a Bezier segment from its current position to a
//! uniformly random destination inside the area, with randomly offset
//! control points for curvature. When a path is exhausted the node snaps to
//! the destination and a fresh segment is generated, carrying any leftover
//! progress over.

use rand::Rng;

use crate::lorawan::node::Node;

/// Control points of one cubic Bezier segment.
#[derive(Debug, Clone, Copy)]
pub struct BezierPath {
    pub p0: (f64, f64),
    pub p1: (f64, f64),
    pub p2: (f64, f64),
    pub p3: (f64, f64),
}

impl BezierPath {
    /// Position on the curve at parameter `t` in [0, 1].
    pub fn point(&self, t: f64) -> (f64, f64) {
        let u = 1.0 - t;
        let b0 = u * u * u;
        let b1 = 3.0 * u * u * t;
        let b2 = 3.0 * u * t * t;
        let b3 = t * t * t;
        (
            b0 * self.p0.0 + b1 * self.p1.0 + b2 * self.p2.0 + b3 * self.p3.0,
            b0 * self.p0.1 + b1 * self.p1.1 + b2 * self.p2.1 + b3 * self.p3.1,
        )
    }

    /// Arc length approximated with `segments` chords.
    pub fn approx_length(&self, segments: usize) -> f64 {
        let mut previous = self.point(0.0);
        let mut length = 0.0;
        for i in 1..=segments {
            let t = i as f64 / segments as f64;
            let position = self.point(t);
            length += (position.0 - previous.0).hypot(position.1 - previous.1);
            previous = position;
        }
        length
    }
}

/// Generates and advances Bezier paths for mobile nodes.
#[derive(Debug, Clone)]
pub struct SmoothMobility {
    pub area_size_m: f64,
    pub min_speed_mps: f64,
    pub max_speed_mps: f64,
    /// Interval between mobility updates, in seconds.
    pub step_s: f64,
}

const LENGTH_SEGMENTS: usize = 20;

impl SmoothMobility {
    pub fn new(area_size_m: f64, min_speed_mps: f64, max_speed_mps: f64) -> Self {
        Self {
            area_size_m,
            min_speed_mps,
            max_speed_mps,
            step_s: 1.0,
        }
    }

    /// Give a node its speed and first path.
    pub fn assign<R: Rng>(&self, node: &mut Node, rng: &mut R) {
        node.speed_mps = rng.gen_range(self.min_speed_mps..=self.max_speed_mps);
        let path = self.generate_path(node.x, node.y, rng);
        node.path_duration_s = path.approx_length(LENGTH_SEGMENTS) / node.speed_mps;
        node.path = Some(path);
        node.path_progress = 0.0;
        node.last_move_time = 0.0;
    }

    fn generate_path<R: Rng>(&self, x: f64, y: f64, rng: &mut R) -> BezierPath {
        let start = (x, y);
        let dest = (
            rng.gen::<f64>() * self.area_size_m,
            rng.gen::<f64>() * self.area_size_m,
        );
        let offset = (
            (rng.gen::<f64>() - 0.5) * self.area_size_m * 0.1,
            (rng.gen::<f64>() - 0.5) * self.area_size_m * 0.1,
        );
        let p1 = (
            start.0 + (dest.0 - start.0) / 3.0 + offset.0,
            start.1 + (dest.1 - start.1) / 3.0 + offset.1,
        );
        let p2 = (
            start.0 + 2.0 * (dest.0 - start.0) / 3.0 - offset.0,
            start.1 + 2.0 * (dest.1 - start.1) / 3.0 - offset.1,
        );
        BezierPath {
            p0: start,
            p1,
            p2,
            p3: dest,
        }
    }

    /// Move a node along its path up to `current_time`.
    pub fn advance<R: Rng>(&self, node: &mut Node, current_time: f64, rng: &mut R) {
        let elapsed = current_time - node.last_move_time;
        if elapsed <= 0.0 {
            return;
        }
        let Some(mut path) = node.path else {
            return;
        };
        if node.path_duration_s <= 0.0 {
            return;
        }
        node.path_progress += elapsed / node.path_duration_s;
        while node.path_progress >= 1.0 {
            // destination reached, start a new segment
            node.x = path.p3.0;
            node.y = path.p3.1;
            path = self.generate_path(node.x, node.y, rng);
            node.path_progress -= 1.0;
            node.path_duration_s = path.approx_length(LENGTH_SEGMENTS) / node.speed_mps;
        }
        let (x, y) = path.point(node.path_progress);
        node.x = x;
        node.y = y;
        node.path = Some(path);
        node.last_move_time = current_time;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::radio::params::SpreadingFactor;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_bezier_endpoints() {
        let path = BezierPath {
            p0: (0.0, 0.0),
            p1: (1.0, 2.0),
            p2: (2.0, 2.0),
            p3: (3.0, 0.0),
        };
        assert_eq!(path.point(0.0), (0.0, 0.0));
        assert_eq!(path.point(1.0), (3.0, 0.0));
    }

    #[test]
    fn test_straight_line_length() {
        let path = BezierPath {
            p0: (0.0, 0.0),
            p1: (1.0, 0.0),
            p2: (2.0, 0.0),
            p3: (3.0, 0.0),
        };
        assert!((path.approx_length(20) - 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_advance_moves_node() {
        let mobility = SmoothMobility::new(100.0, 2.0, 5.0);
        let mut rng = StdRng::seed_from_u64(11);
        let mut node = Node::new(0, 50.0, 50.0, SpreadingFactor::SF7, 14.0, 0);
        mobility.assign(&mut node, &mut rng);
        assert!(node.speed_mps >= 2.0 && node.speed_mps <= 5.0);
        let before = (node.x, node.y);
        mobility.advance(&mut node, 1.0, &mut rng);
        assert_ne!((node.x, node.y), before);
        assert_eq!(node.last_move_time, 1.0);
        assert!(node.path_progress > 0.0);
    }

    #[test]
    fn test_progress_wraps_into_new_path() {
        let mobility = SmoothMobility::new(100.0, 2.0, 2.0);
        let mut rng = StdRng::seed_from_u64(3);
        let mut node = Node::new(0, 10.0, 10.0, SpreadingFactor::SF7, 14.0, 0);
        mobility.assign(&mut node, &mut rng);
        // jump far past the end of the first path
        let far = node.path_duration_s * 2.5;
        mobility.advance(&mut node, far, &mut rng);
        assert!(node.path_progress < 1.0);
        assert!(node.path.is_some());
    }
}
