//! Relation curve geometry.

use crate::model::SpanId;

use super::Point;

/// Curve samples used for hit testing
const HIT_SAMPLES: usize = 20;

/// Shape and stroke parameters for relation arcs
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ArcStyle {
    /// Gap between the higher anchor and the curve endpoints
    pub base_offset: f32,
    pub min_lift: f32,
    /// Extra lift per unit of vertical distance between the anchors
    pub lift_per_dy: f32,
    pub max_lift: f32,
    /// Distance from the peak to the label baseline
    pub label_gap: f32,
    pub stroke_width: f32,
    pub hover_extra_width: f32,
    pub opacity: f32,
    pub hover_opacity: f32,
    pub dashed: bool,
}

impl Default for ArcStyle {
    /// Pixel units
    fn default() -> Self {
        Self {
            base_offset: 10.0,
            min_lift: 20.0,
            lift_per_dy: 0.2,
            max_lift: 80.0,
            label_gap: 4.0,
            stroke_width: 2.0,
            hover_extra_width: 1.0,
            opacity: 0.75,
            hover_opacity: 1.0,
            dashed: false,
        }
    }
}

impl ArcStyle {
    /// Cell units, for a grid with two blank rows above every text row
    pub fn terminal() -> Self {
        Self {
            base_offset: 1.0,
            min_lift: 1.2,
            lift_per_dy: 0.05,
            max_lift: 1.3,
            label_gap: 0.0,
            stroke_width: 1.0,
            hover_extra_width: 1.0,
            opacity: 0.75,
            hover_opacity: 1.0,
            dashed: false,
        }
    }

    pub fn lift(&self, dy: f32) -> f32 {
        (self.min_lift + self.lift_per_dy * dy.abs()).clamp(self.min_lift, self.max_lift.max(self.min_lift))
    }

    pub fn stroke(&self, hovered: bool) -> Stroke {
        if hovered {
            Stroke {
                width: self.stroke_width + self.hover_extra_width,
                opacity: self.hover_opacity,
                dashed: self.dashed,
            }
        } else {
            Stroke {
                width: self.stroke_width,
                opacity: self.opacity,
                dashed: self.dashed,
            }
        }
    }
}

/// How an arc is painted; hover changes this, never the curve
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Stroke {
    pub width: f32,
    pub opacity: f32,
    pub dashed: bool,
}

/// Cubic curve from one span anchor to another, bulging upwards
#[derive(Debug, Clone, PartialEq)]
pub struct RelationArc {
    pub from: SpanId,
    pub to: SpanId,
    pub p0: Point,
    pub p1: Point,
    pub p2: Point,
    pub p3: Point,
    pub peak: Point,
    pub label_at: Point,
}

impl RelationArc {
    pub fn between(from: SpanId, to: SpanId, a: Point, b: Point, style: &ArcStyle) -> Self {
        let dy = (b.y - a.y).abs();
        let y0 = a.y.min(b.y) - style.base_offset;
        let mid_x = (a.x + b.x) / 2.0;
        let control = Point::new(mid_x, y0 - style.lift(dy));

        let mut arc = Self {
            from,
            to,
            p0: Point::new(a.x, y0),
            p1: control,
            p2: control,
            p3: Point::new(b.x, y0),
            peak: control,
            label_at: control,
        };
        arc.peak = arc.eval(0.5);
        arc.label_at = Point::new(mid_x, arc.peak.y - style.label_gap);
        arc
    }

    /// Point on the curve at `t` in `[0, 1]`
    pub fn eval(&self, t: f32) -> Point {
        let mt = 1.0 - t;
        let a = mt * mt * mt;
        let b = 3.0 * mt * mt * t;
        let c = 3.0 * mt * t * t;
        let d = t * t * t;
        Point::new(
            a * self.p0.x + b * self.p1.x + c * self.p2.x + d * self.p3.x,
            a * self.p0.y + b * self.p1.y + c * self.p2.y + d * self.p3.y,
        )
    }

    /// `segments + 1` evenly spaced points along the curve
    pub fn sample(&self, segments: usize) -> Vec<Point> {
        let segments = segments.max(1);
        (0..=segments)
            .map(|i| self.eval(i as f32 / segments as f32))
            .collect()
    }

    /// Approximate distance from `point` to the curve
    pub fn distance_to(&self, point: Point) -> f32 {
        self.sample(HIT_SAMPLES)
            .windows(2)
            .map(|w| distance_to_segment_sq(point, w[0], w[1]))
            .fold(f32::MAX, f32::min)
            .sqrt()
    }
}

fn distance_to_segment_sq(p: Point, a: Point, b: Point) -> f32 {
    let ab = (b.x - a.x, b.y - a.y);
    let ap = (p.x - a.x, p.y - a.y);
    let len_sq = ab.0 * ab.0 + ab.1 * ab.1;
    if len_sq < f32::EPSILON {
        return ap.0 * ap.0 + ap.1 * ap.1;
    }
    let t = ((ap.0 * ab.0 + ap.1 * ab.1) / len_sq).clamp(0.0, 1.0);
    let dx = p.x - (a.x + t * ab.0);
    let dy = p.y - (a.y + t * ab.1);
    dx * dx + dy * dy
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-3
    }

    #[test]
    fn same_line_arc_uses_minimum_lift() {
        let style = ArcStyle::default();
        let arc = RelationArc::between(
            SpanId(1),
            SpanId(2),
            Point::new(20.0, 100.0),
            Point::new(180.0, 100.0),
            &style,
        );
        assert_eq!(arc.p0, Point::new(20.0, 90.0));
        assert_eq!(arc.p3, Point::new(180.0, 90.0));
        assert!(close(arc.p1.y, 70.0));
        // Both control points coincide, so the peak sits 3/4 of the way up
        assert!(close(arc.peak.x, 100.0));
        assert!(close(arc.peak.y, 75.0));
        assert!(close(arc.label_at.y, 71.0));
    }

    #[test]
    fn lift_grows_with_line_distance_up_to_cap() {
        let style = ArcStyle::default();
        assert!(close(style.lift(0.0), 20.0));
        assert!(close(style.lift(50.0), 30.0));
        assert!(close(style.lift(-50.0), 30.0));
        assert!(close(style.lift(10_000.0), 80.0));
    }

    #[test]
    fn arc_stays_above_higher_anchor() {
        let style = ArcStyle::default();
        let a = Point::new(300.0, 40.0);
        let b = Point::new(10.0, 140.0);
        let arc = RelationArc::between(SpanId(1), SpanId(2), a, b, &style);
        for p in arc.sample(32) {
            assert!(p.y <= a.y.min(b.y) - style.base_offset + 1e-3);
        }
    }

    #[test]
    fn hover_changes_stroke_only() {
        let style = ArcStyle::default();
        let plain = style.stroke(false);
        let hot = style.stroke(true);
        assert!(hot.width > plain.width);
        assert!(hot.opacity > plain.opacity);
    }

    #[test]
    fn distance_is_zero_on_curve() {
        let style = ArcStyle::default();
        let arc = RelationArc::between(
            SpanId(1),
            SpanId(2),
            Point::new(0.0, 50.0),
            Point::new(100.0, 50.0),
            &style,
        );
        assert!(arc.distance_to(arc.peak) < 0.5);
        assert!(arc.distance_to(Point::new(50.0, 200.0)) > 100.0);
    }
}
