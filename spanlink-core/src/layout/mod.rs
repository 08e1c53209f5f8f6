//! Layout engine: character rectangles in, drawable span and relation geometry out.

mod arc;
mod measure;

pub use arc::{ArcStyle, RelationArc, Stroke};
pub use measure::{GridMeasurer, MeasureParams, Measurement, Measurer};

use tracing::trace;

use crate::model::{Relation, Span, SpanId};
use crate::selection::RenderNodes;

/// Rows closer than this are the same visual line
const SAME_LINE_EPSILON: f32 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Bounding box in container-local coordinates
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CharRect {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl CharRect {
    pub fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self { x, y, w, h }
    }

    pub fn center(&self) -> Point {
        Point::new(self.x + self.w / 2.0, self.y + self.h / 2.0)
    }

    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.x && p.x < self.x + self.w && p.y >= self.y && p.y < self.y + self.h
    }
}

/// One rectangle per visual line covered by `[start, end)`.
///
/// Each rectangle starts at the first character of its run and is as wide as
/// the run's characters combined. Offsets past `rects` are ignored so a stale
/// measurement never panics.
pub fn segments(start: usize, end: usize, rects: &[CharRect]) -> Vec<CharRect> {
    let mut out = Vec::new();
    let end = end.min(rects.len());
    let mut i = start;
    while i < end {
        let first = rects[i];
        let mut w = first.w;
        let mut j = i + 1;
        while j < end && (rects[j].y - first.y).abs() < SAME_LINE_EPSILON {
            w += rects[j].w;
            j += 1;
        }
        out.push(CharRect::new(first.x, first.y, w, first.h));
        i = j;
    }
    out
}

/// Top-centre of the first segment
pub fn anchor(segments: &[CharRect]) -> Option<Point> {
    segments
        .first()
        .map(|first| Point::new(first.x + first.w / 2.0, first.y))
}

/// Nearest character to `point`, by Manhattan distance to rect centres
pub fn char_index_at(point: Point, rects: &[CharRect]) -> Option<usize> {
    rects
        .iter()
        .enumerate()
        .map(|(i, r)| {
            let c = r.center();
            (i, (point.x - c.x).abs() + (point.y - c.y).abs())
        })
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(i, _)| i)
}

#[derive(Debug, Clone, PartialEq)]
pub struct SpanBox {
    pub id: SpanId,
    pub segments: Vec<CharRect>,
    pub anchor: Option<Point>,
}

/// Everything a renderer needs to paint one frame
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Geometry {
    /// In span list order; later entries paint on top
    pub spans: Vec<SpanBox>,
    /// Index-aligned with the relation list; `None` when an endpoint is not laid out
    pub arcs: Vec<Option<RelationArc>>,
}

impl Geometry {
    pub fn build(spans: &[Span], relations: &[Relation], rects: &[CharRect], style: &ArcStyle) -> Self {
        let spans: Vec<SpanBox> = spans
            .iter()
            .map(|s| {
                let segments = segments(s.start, s.end, rects);
                SpanBox {
                    id: s.id,
                    anchor: anchor(&segments),
                    segments,
                }
            })
            .collect();

        let anchor_of = |id: SpanId| spans.iter().find(|b| b.id == id).and_then(|b| b.anchor);
        let arcs = relations
            .iter()
            .map(|r| {
                let a = anchor_of(r.from_id)?;
                let b = anchor_of(r.to_id)?;
                Some(RelationArc::between(r.from_id, r.to_id, a, b, style))
            })
            .collect();

        Self { spans, arcs }
    }

    pub fn span_box(&self, id: SpanId) -> Option<&SpanBox> {
        self.spans.iter().find(|b| b.id == id)
    }

    /// Topmost span whose highlight contains `point`
    pub fn span_at(&self, point: Point) -> Option<SpanId> {
        self.spans
            .iter()
            .rev()
            .find(|b| b.segments.iter().any(|seg| seg.contains(point)))
            .map(|b| b.id)
    }

    /// Index of the closest relation arc within `tolerance` of `point`
    pub fn relation_at(&self, point: Point, tolerance: f32) -> Option<usize> {
        self.arcs
            .iter()
            .enumerate()
            .filter_map(|(i, arc)| arc.as_ref().map(|arc| (i, arc.distance_to(point))))
            .filter(|(_, d)| *d <= tolerance)
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(i, _)| i)
    }
}

/// Cache key for a measurement; any change forces a re-measure
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeasureKey {
    pub char_count: usize,
    pub text_revision: u64,
    pub span_revision: u64,
    pub params: MeasureParams,
}

/// What the engine needs to know about the document to lay it out
#[derive(Debug, Clone, Copy)]
pub struct LayoutInput<'a> {
    pub text: &'a str,
    pub text_revision: u64,
    pub spans: &'a [Span],
    pub span_revision: u64,
    pub relations: &'a [Relation],
}

/// Measure-then-paint driver.
///
/// Measurement is held as a plain array indexed by character offset and
/// replaced wholesale whenever the [`MeasureKey`] changes. Geometry is derived
/// from it on every [`prepare`](LayoutEngine::prepare); neither step touches
/// the annotation data.
#[derive(Debug, Clone)]
pub struct LayoutEngine {
    pub style: ArcStyle,
    key: Option<MeasureKey>,
    measurement: Option<Measurement>,
    geometry: Geometry,
    measure_count: u64,
}

impl LayoutEngine {
    pub fn new(style: ArcStyle) -> Self {
        Self {
            style,
            key: None,
            measurement: None,
            geometry: Geometry::default(),
            measure_count: 0,
        }
    }

    /// Force a re-measure before the next paint
    pub fn invalidate(&mut self) {
        self.key = None;
    }

    pub fn prepare(&mut self, input: LayoutInput<'_>, measurer: &mut dyn Measurer) -> &Geometry {
        let key = MeasureKey {
            char_count: input.text.chars().count(),
            text_revision: input.text_revision,
            span_revision: input.span_revision,
            params: measurer.params(),
        };
        if self.key != Some(key) {
            self.measurement = Some(measurer.measure(input.text));
            self.key = Some(key);
            self.measure_count += 1;
            trace!(chars = key.char_count, "layout re-measured");
        }
        self.geometry = Geometry::build(input.spans, input.relations, self.rects(), &self.style);
        &self.geometry
    }

    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    pub fn rects(&self) -> &[CharRect] {
        self.measurement
            .as_ref()
            .map(|m| m.rects.as_slice())
            .unwrap_or(&[])
    }

    pub fn nodes(&self) -> Option<&RenderNodes> {
        self.measurement.as_ref().map(|m| &m.nodes)
    }

    pub fn char_index_at(&self, point: Point) -> Option<usize> {
        char_index_at(point, self.rects())
    }

    /// Number of measurement passes so far
    pub fn measure_count(&self) -> u64 {
        self.measure_count
    }
}

impl Default for LayoutEngine {
    fn default() -> Self {
        Self::new(ArcStyle::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TextRange;
    use crate::selection::ContainerId;

    fn row(y: f32, xs: std::ops::Range<usize>) -> Vec<CharRect> {
        xs.map(|x| CharRect::new(x as f32 * 10.0, y, 10.0, 18.0)).collect()
    }

    #[test]
    fn segments_split_per_visual_line() {
        // chars 0..6 on row A, 6..10 on row B
        let mut rects = row(0.0, 0..6);
        rects.extend(row(30.0, 0..4));

        let segs = segments(3, 8, &rects);
        assert_eq!(segs.len(), 2);
        assert_eq!(segs[0], CharRect::new(30.0, 0.0, 30.0, 18.0));
        assert_eq!(segs[1], CharRect::new(0.0, 30.0, 20.0, 18.0));
    }

    #[test]
    fn segments_tolerate_subpixel_jitter_and_short_measurements() {
        let mut rects = row(0.0, 0..3);
        rects[2].y = 0.3;
        assert_eq!(segments(0, 3, &rects).len(), 1);
        assert_eq!(segments(1, 50, &rects), vec![CharRect::new(10.0, 0.0, 20.0, 18.0)]);
        assert!(segments(5, 9, &rects).is_empty());
        assert!(segments(2, 2, &rects).is_empty());
    }

    #[test]
    fn anchor_is_top_centre_of_first_line() {
        let mut rects = row(0.0, 0..6);
        rects.extend(row(30.0, 0..4));
        let segs = segments(4, 9, &rects);
        assert_eq!(anchor(&segs), Some(Point::new(50.0, 0.0)));
    }

    #[test]
    fn geometry_hit_tests_topmost_span() {
        let rects = row(0.0, 0..10);
        let spans = vec![
            Span::new(SpanId(1), TextRange::new(0, 6), "PER"),
            Span::new(SpanId(2), TextRange::new(2, 4), "LOC"),
        ];
        let relations = vec![Relation::new(SpanId(1), SpanId(2), "LOCATED_IN")];
        let geo = Geometry::build(&spans, &relations, &rects, &ArcStyle::default());

        assert_eq!(geo.span_at(Point::new(25.0, 5.0)), Some(SpanId(2)));
        assert_eq!(geo.span_at(Point::new(5.0, 5.0)), Some(SpanId(1)));
        assert_eq!(geo.span_at(Point::new(95.0, 5.0)), None);
        assert!(geo.arcs[0].is_some());
    }

    #[test]
    fn relation_with_unmeasured_endpoint_has_no_arc() {
        let rects = row(0.0, 0..4);
        let spans = vec![
            Span::new(SpanId(1), TextRange::new(0, 2), "PER"),
            Span::new(SpanId(2), TextRange::new(8, 9), "LOC"),
        ];
        let relations = vec![Relation::new(SpanId(1), SpanId(2), "LOCATED_IN")];
        let geo = Geometry::build(&spans, &relations, &rects, &ArcStyle::default());
        assert_eq!(geo.arcs, vec![None]);
        assert_eq!(geo.relation_at(Point::new(10.0, -20.0), 50.0), None);
    }

    #[test]
    fn nearest_char_by_manhattan_distance() {
        let rects = row(0.0, 0..5);
        assert_eq!(char_index_at(Point::new(31.0, 9.0), &rects), Some(3));
        assert_eq!(char_index_at(Point::new(31.0, 9.0), &[]), None);
    }

    #[test]
    fn engine_measures_only_when_key_changes() {
        let mut engine = LayoutEngine::new(ArcStyle::terminal());
        let mut measurer = GridMeasurer::new(ContainerId(0), 40, 3);
        let spans = vec![Span::new(SpanId(1), TextRange::new(0, 4), "PER")];
        let input = LayoutInput {
            text: "Mike lives in America.",
            text_revision: 1,
            spans: &spans,
            span_revision: 1,
            relations: &[],
        };

        engine.prepare(input, &mut measurer);
        engine.prepare(input, &mut measurer);
        assert_eq!(engine.measure_count(), 1);

        engine.prepare(LayoutInput { span_revision: 2, ..input }, &mut measurer);
        assert_eq!(engine.measure_count(), 2);

        measurer.width = 12;
        let geo = engine.prepare(LayoutInput { span_revision: 2, ..input }, &mut measurer);
        assert_eq!(geo.spans[0].segments.len(), 1);
        assert_eq!(engine.measure_count(), 3);

        engine.invalidate();
        engine.prepare(LayoutInput { span_revision: 2, ..input }, &mut measurer);
        assert_eq!(engine.measure_count(), 4);
    }
}
