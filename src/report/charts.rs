// Chart rendering: each view is drawn as SVG, then rasterized to PNG.

use std::sync::Arc;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use resvg::tiny_skia;
use resvg::usvg;

use turnout_stats::{Aggregates, FIRST_AGE, LAST_AGE};

use crate::report::html::escape_markup;
use crate::report::*;

const FONT_FAMILY: &str = "Arial, Helvetica, 'DejaVu Sans', sans-serif";
const GRID_COLOR: &str = "#dddddd";
const TEXT_COLOR: &str = "#333333";
const TITLE_HEIGHT: f64 = 50.0;
const BOTTOM_MARGIN: f64 = 60.0;
const RIGHT_MARGIN: f64 = 30.0;

/// One chart, ready to be embedded.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct RenderedChart {
    pub name: String,
    pub title: String,
    pub alt: String,
    /// The PNG image, base64-encoded.
    pub png_base64: String,
}

impl RenderedChart {
    pub fn data_uri(&self) -> String {
        format!("data:image/png;base64,{}", self.png_base64)
    }
}

/// Renders all the charts of the report, in order.
///
/// The charts are rasterized one after the other, so that only one drawing surface
/// is alive at any time.
pub fn render_charts(aggs: &Aggregates, cfg: &ChartsConfig) -> ReportResult<Vec<RenderedChart>> {
    let renderer = ChartRenderer::new();
    let size = (cfg.width as f64, cfg.height as f64);
    let caption = cfg.empty_caption.as_str();
    let charts = [
        (
            "county_turnout",
            &cfg.county_turnout,
            county_turnout_svg(aggs, &cfg.county_turnout, size, caption),
        ),
        (
            "settlement_turnout",
            &cfg.settlement_turnout,
            settlement_turnout_svg(aggs, &cfg.settlement_turnout, size, caption),
        ),
        (
            "sex_totals",
            &cfg.sex_totals,
            sex_totals_svg(aggs, &cfg.sex_totals, size),
        ),
        (
            "age_distribution",
            &cfg.age_distribution,
            age_distribution_svg(aggs, &cfg.age_distribution, size, caption),
        ),
        (
            "top_localities",
            &cfg.top_localities,
            top_localities_svg(aggs, &cfg.top_localities, size, caption),
        ),
        (
            "sex_by_county",
            &cfg.sex_by_county,
            sex_by_county_svg(aggs, &cfg.sex_by_county, size, caption),
        ),
    ];
    let mut res: Vec<RenderedChart> = Vec::with_capacity(charts.len());
    for (name, style, svg) in charts.iter() {
        res.push(renderer.render(name, style, svg)?);
    }
    Ok(res)
}

/// Turns SVG documents into PNG images.
pub struct ChartRenderer {
    fontdb: Arc<usvg::fontdb::Database>,
}

impl ChartRenderer {
    pub fn new() -> ChartRenderer {
        let mut db = usvg::fontdb::Database::new();
        db.load_system_fonts();
        debug!("ChartRenderer::new: {} font faces", db.len());
        if db.is_empty() {
            warn!("No system font found: the charts will have no text");
        }
        ChartRenderer {
            fontdb: Arc::new(db),
        }
    }

    pub fn render(&self, name: &str, style: &ChartStyle, svg: &str) -> ReportResult<RenderedChart> {
        let png = self.rasterize(name, svg)?;
        info!("Rendered chart {} ({} bytes)", name, png.len());
        Ok(RenderedChart {
            name: name.to_string(),
            title: style.title.clone(),
            alt: style.alt.clone(),
            png_base64: STANDARD.encode(png),
        })
    }

    fn rasterize(&self, name: &str, svg: &str) -> ReportResult<Vec<u8>> {
        let opt = usvg::Options {
            fontdb: self.fontdb.clone(),
            ..usvg::Options::default()
        };
        let tree = usvg::Tree::from_str(svg, &opt).context(ChartParsingSnafu { chart: name })?;
        let size = tree.size().to_int_size();
        // The surface is dropped at the end of this function, once encoded.
        let mut pixmap = tiny_skia::Pixmap::new(size.width(), size.height())
            .context(ChartSurfaceSnafu { chart: name })?;
        pixmap.fill(tiny_skia::Color::WHITE);
        resvg::render(&tree, tiny_skia::Transform::default(), &mut pixmap.as_mut());
        pixmap
            .encode_png()
            .map_err(|e| ReportError::ChartEncoding {
                chart: name.to_string(),
                message: e.to_string(),
            })
    }
}

// ******** SVG primitives ********

struct Svg {
    buf: String,
}

impl Svg {
    fn new(width: f64, height: f64) -> Svg {
        let mut buf = format!(
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}">"#,
            w = width,
            h = height
        );
        buf.push_str(&format!(
            r#"<rect x="0" y="0" width="{}" height="{}" fill="white"/>"#,
            width, height
        ));
        Svg { buf }
    }

    fn rect(&mut self, x: f64, y: f64, width: f64, height: f64, fill: &str) {
        self.buf.push_str(&format!(
            r#"<rect x="{:.1}" y="{:.1}" width="{:.1}" height="{:.1}" fill="{}"/>"#,
            x,
            y,
            width.max(0.0),
            height.max(0.0),
            escape_markup(fill)
        ));
    }

    fn line(&mut self, x1: f64, y1: f64, x2: f64, y2: f64, stroke: &str, width: f64) {
        self.buf.push_str(&format!(
            r#"<line x1="{:.1}" y1="{:.1}" x2="{:.1}" y2="{:.1}" stroke="{}" stroke-width="{}"/>"#,
            x1,
            y1,
            x2,
            y2,
            escape_markup(stroke),
            width
        ));
    }

    fn polyline(&mut self, points: &[(f64, f64)], stroke: &str, width: f64) {
        let pts: Vec<String> = points
            .iter()
            .map(|(x, y)| format!("{:.1},{:.1}", x, y))
            .collect();
        self.buf.push_str(&format!(
            r#"<polyline points="{}" fill="none" stroke="{}" stroke-width="{}"/>"#,
            pts.join(" "),
            escape_markup(stroke),
            width
        ));
    }

    fn text(&mut self, x: f64, y: f64, size: f64, anchor: &str, content: &str) {
        self.buf.push_str(&format!(
            r#"<text x="{:.1}" y="{:.1}" font-family="{}" font-size="{:.1}" text-anchor="{}" fill="{}">{}</text>"#,
            x,
            y,
            FONT_FAMILY,
            size,
            anchor,
            TEXT_COLOR,
            escape_markup(content)
        ));
    }

    fn text_vertical(&mut self, x: f64, y: f64, size: f64, content: &str) {
        self.buf.push_str(&format!(
            r#"<text x="{x:.1}" y="{y:.1}" font-family="{}" font-size="{:.1}" text-anchor="middle" fill="{}" transform="rotate(-90, {x:.1}, {y:.1})">{}</text>"#,
            FONT_FAMILY,
            size,
            TEXT_COLOR,
            escape_markup(content),
            x = x,
            y = y
        ));
    }

    fn finish(mut self) -> String {
        self.buf.push_str("</svg>");
        self.buf
    }
}

/// The drawing area inside the margins.
#[derive(Debug, Clone, Copy)]
struct Area {
    x0: f64,
    y0: f64,
    x1: f64,
    y1: f64,
}

impl Area {
    fn new(size: (f64, f64), left: f64) -> Area {
        Area {
            x0: left,
            y0: TITLE_HEIGHT,
            x1: (size.0 - RIGHT_MARGIN).max(left + 1.0),
            y1: (size.1 - BOTTOM_MARGIN).max(TITLE_HEIGHT + 1.0),
        }
    }

    fn width(&self) -> f64 {
        self.x1 - self.x0
    }

    fn height(&self) -> f64 {
        self.y1 - self.y0
    }
}

/// A value axis starting at zero.
#[derive(PartialEq, Debug, Clone)]
struct ValueAxis {
    max: f64,
    ticks: Vec<f64>,
    decimals: usize,
}

fn nice_step(span: f64, target: usize) -> f64 {
    if !(span.is_finite() && span > 0.0) {
        return 1.0;
    }
    let raw = span / target as f64;
    let mag = 10f64.powf(raw.log10().floor());
    let norm = raw / mag;
    let nice = if norm <= 1.0 {
        1.0
    } else if norm <= 2.0 {
        2.0
    } else if norm <= 2.5 {
        2.5
    } else if norm <= 5.0 {
        5.0
    } else {
        10.0
    };
    nice * mag
}

// The number of decimals needed to print multiples of the step exactly.
fn step_decimals(step: f64) -> usize {
    (0..8)
        .find(|d| {
            let x = step * 10f64.powi(*d as i32);
            (x - x.round()).abs() < 1e-6
        })
        .unwrap_or(8)
}

impl ValueAxis {
    fn new(max_value: f64) -> ValueAxis {
        let span = if max_value.is_finite() && max_value > 0.0 {
            max_value
        } else {
            1.0
        };
        let step = nice_step(span, 5);
        let n = (span / step).ceil().max(1.0) as usize;
        ValueAxis {
            max: step * n as f64,
            ticks: (0..=n).map(|i| step * i as f64).collect(),
            decimals: step_decimals(step),
        }
    }

    fn fraction(&self, v: f64) -> f64 {
        (v / self.max).clamp(0.0, 1.0)
    }

    fn label(&self, v: f64) -> String {
        format!("{:.*}", self.decimals, v)
    }
}

fn color(colors: &[String], idx: usize) -> &str {
    if colors.is_empty() {
        "steelblue"
    } else {
        colors[idx % colors.len()].as_str()
    }
}

fn series_label<'a>(style: &'a ChartStyle, idx: usize, default: &'a str) -> &'a str {
    style.labels.get(idx).map(|s| s.as_str()).unwrap_or(default)
}

// Rough width of a label, enough to size the left margin.
fn label_margin(labels: &[&str], font_size: f64) -> f64 {
    let longest = labels.iter().map(|l| l.chars().count()).max().unwrap_or(0);
    (longest as f64 * font_size * 0.6 + 20.0).clamp(60.0, 360.0)
}

fn title(svg: &mut Svg, size: (f64, f64), style: &ChartStyle) {
    svg.text(size.0 / 2.0, 30.0, 18.0, "middle", &style.title);
}

fn axis_labels(svg: &mut Svg, area: &Area, size: (f64, f64), style: &ChartStyle) {
    if let Some(x_label) = &style.x_label {
        svg.text(
            (area.x0 + area.x1) / 2.0,
            size.1 - 15.0,
            14.0,
            "middle",
            x_label,
        );
    }
    if let Some(y_label) = &style.y_label {
        svg.text_vertical(18.0, (area.y0 + area.y1) / 2.0, 14.0, y_label);
    }
}

fn frame(svg: &mut Svg, area: &Area) {
    svg.line(area.x0, area.y1, area.x1, area.y1, TEXT_COLOR, 1.0);
    svg.line(area.x0, area.y0, area.x0, area.y1, TEXT_COLOR, 1.0);
}

fn legend(svg: &mut Svg, area: &Area, entries: &[(&str, &str)]) {
    let x = area.x1 - 150.0;
    for (idx, (label, c)) in entries.iter().enumerate() {
        let y = area.y0 + 15.0 + 20.0 * idx as f64;
        svg.rect(x, y - 9.0, 24.0, 10.0, c);
        svg.text(x + 32.0, y, 12.0, "start", label);
    }
}

fn placeholder(size: (f64, f64), style: &ChartStyle, caption: &str) -> String {
    let mut svg = Svg::new(size.0, size.1);
    title(&mut svg, size, style);
    let area = Area::new(size, 60.0);
    frame(&mut svg, &area);
    axis_labels(&mut svg, &area, size, style);
    svg.text(
        (area.x0 + area.x1) / 2.0,
        (area.y0 + area.y1) / 2.0,
        16.0,
        "middle",
        caption,
    );
    svg.finish()
}

// ******** Chart types ********

/// Horizontal bars, one per row, drawn from the top down. A row without a value
/// keeps its label but has no bar.
fn hbar_svg(
    size: (f64, f64),
    style: &ChartStyle,
    rows: &[(String, Option<f64>)],
    caption: &str,
) -> String {
    if rows.is_empty() {
        return placeholder(size, style, caption);
    }
    let row_height = (size.1 - TITLE_HEIGHT - BOTTOM_MARGIN) / rows.len() as f64;
    let font = (row_height * 0.8).clamp(7.0, 12.0);
    let labels: Vec<&str> = rows.iter().map(|r| r.0.as_str()).collect();
    let area = Area::new(size, label_margin(&labels, font));
    let axis = ValueAxis::new(rows.iter().filter_map(|r| r.1).fold(0.0, f64::max));

    let mut svg = Svg::new(size.0, size.1);
    title(&mut svg, size, style);
    for t in axis.ticks.iter() {
        let x = area.x0 + axis.fraction(*t) * area.width();
        svg.line(x, area.y0, x, area.y1, GRID_COLOR, 1.0);
        svg.text(x, area.y1 + 16.0, 11.0, "middle", &axis.label(*t));
    }
    let band = area.height() / rows.len() as f64;
    for (idx, (label, value)) in rows.iter().enumerate() {
        let y = area.y0 + band * idx as f64;
        if let Some(v) = value {
            svg.rect(
                area.x0,
                y + band * 0.1,
                axis.fraction(*v) * area.width(),
                band * 0.8,
                color(&style.colors, idx),
            );
        }
        svg.text(area.x0 - 6.0, y + band / 2.0 + font / 3.0, font, "end", label);
    }
    frame(&mut svg, &area);
    axis_labels(&mut svg, &area, size, style);
    svg.finish()
}

/// Two bars per row, one for each series.
fn grouped_hbar_svg(
    size: (f64, f64),
    style: &ChartStyle,
    rows: &[(String, [f64; 2])],
    series: [&str; 2],
    caption: &str,
) -> String {
    if rows.is_empty() {
        return placeholder(size, style, caption);
    }
    let row_height = (size.1 - TITLE_HEIGHT - BOTTOM_MARGIN) / rows.len() as f64;
    let font = (row_height * 0.8).clamp(7.0, 12.0);
    let labels: Vec<&str> = rows.iter().map(|r| r.0.as_str()).collect();
    let area = Area::new(size, label_margin(&labels, font));
    let max = rows
        .iter()
        .flat_map(|r| r.1.iter().cloned())
        .fold(0.0, f64::max);
    let axis = ValueAxis::new(max);

    let mut svg = Svg::new(size.0, size.1);
    title(&mut svg, size, style);
    for t in axis.ticks.iter() {
        let x = area.x0 + axis.fraction(*t) * area.width();
        svg.line(x, area.y0, x, area.y1, GRID_COLOR, 1.0);
        svg.text(x, area.y1 + 16.0, 11.0, "middle", &axis.label(*t));
    }
    let band = area.height() / rows.len() as f64;
    for (idx, (label, values)) in rows.iter().enumerate() {
        let y = area.y0 + band * idx as f64;
        for (s, v) in values.iter().enumerate() {
            svg.rect(
                area.x0,
                y + band * (0.1 + 0.4 * s as f64),
                axis.fraction(*v) * area.width(),
                band * 0.4,
                color(&style.colors, s),
            );
        }
        svg.text(area.x0 - 6.0, y + band / 2.0 + font / 3.0, font, "end", label);
    }
    frame(&mut svg, &area);
    axis_labels(&mut svg, &area, size, style);
    legend(
        &mut svg,
        &area,
        &[
            (series[0], color(&style.colors, 0)),
            (series[1], color(&style.colors, 1)),
        ],
    );
    svg.finish()
}

/// Vertical bars, one per category, each with its own color.
fn vbar_svg(
    size: (f64, f64),
    style: &ChartStyle,
    categories: &[(String, Option<f64>)],
    caption: &str,
) -> String {
    if categories.is_empty() {
        return placeholder(size, style, caption);
    }
    let axis = ValueAxis::new(categories.iter().filter_map(|c| c.1).fold(0.0, f64::max));
    let tick_labels: Vec<String> = axis.ticks.iter().map(|t| axis.label(*t)).collect();
    let tick_refs: Vec<&str> = tick_labels.iter().map(|s| s.as_str()).collect();
    let area = Area::new(size, label_margin(&tick_refs, 11.0) + 30.0);

    let mut svg = Svg::new(size.0, size.1);
    title(&mut svg, size, style);
    for (t, l) in axis.ticks.iter().zip(tick_labels.iter()) {
        let y = area.y1 - axis.fraction(*t) * area.height();
        svg.line(area.x0, y, area.x1, y, GRID_COLOR, 1.0);
        svg.text(area.x0 - 6.0, y + 4.0, 11.0, "end", l);
    }
    let band = area.width() / categories.len() as f64;
    for (idx, (label, value)) in categories.iter().enumerate() {
        let x = area.x0 + band * idx as f64;
        if let Some(v) = value {
            let h = axis.fraction(*v) * area.height();
            svg.rect(
                x + band * 0.2,
                area.y1 - h,
                band * 0.6,
                h,
                color(&style.colors, idx),
            );
        }
        svg.text(x + band / 2.0, area.y1 + 18.0, 12.0, "middle", label);
    }
    frame(&mut svg, &area);
    axis_labels(&mut svg, &area, size, style);
    svg.finish()
}

struct LineSeries<'a> {
    label: &'a str,
    color: &'a str,
    /// A missing value breaks the line.
    points: Vec<(f64, Option<f64>)>,
}

fn line_svg(
    size: (f64, f64),
    style: &ChartStyle,
    x_range: (f64, f64),
    series: &[LineSeries],
    caption: &str,
) -> String {
    let max = series
        .iter()
        .flat_map(|s| s.points.iter().filter_map(|p| p.1))
        .fold(f64::NAN, f64::max);
    if max.is_nan() {
        return placeholder(size, style, caption);
    }
    let axis = ValueAxis::new(max);
    let tick_labels: Vec<String> = axis.ticks.iter().map(|t| axis.label(*t)).collect();
    let tick_refs: Vec<&str> = tick_labels.iter().map(|s| s.as_str()).collect();
    let area = Area::new(size, label_margin(&tick_refs, 11.0) + 30.0);
    let x_span = (x_range.1 - x_range.0).max(1.0);
    let x_at = |x: f64| area.x0 + (x - x_range.0) / x_span * area.width();
    let y_at = |y: f64| area.y1 - axis.fraction(y) * area.height();

    let mut svg = Svg::new(size.0, size.1);
    title(&mut svg, size, style);
    for (t, l) in axis.ticks.iter().zip(tick_labels.iter()) {
        let y = y_at(*t);
        svg.line(area.x0, y, area.x1, y, GRID_COLOR, 1.0);
        svg.text(area.x0 - 6.0, y + 4.0, 11.0, "end", l);
    }
    let x_step = nice_step(x_span, 6);
    let mut xt = (x_range.0 / x_step).ceil() * x_step;
    while xt <= x_range.1 {
        let x = x_at(xt);
        svg.line(x, area.y0, x, area.y1, GRID_COLOR, 1.0);
        svg.text(x, area.y1 + 16.0, 11.0, "middle", &format!("{}", xt));
        xt += x_step;
    }
    for s in series.iter() {
        let mut segment: Vec<(f64, f64)> = Vec::new();
        for (x, y) in s.points.iter() {
            match y {
                Some(y) => segment.push((x_at(*x), y_at(*y))),
                None if !segment.is_empty() => {
                    svg.polyline(&segment, s.color, 2.0);
                    segment.clear();
                }
                None => {}
            }
        }
        if !segment.is_empty() {
            svg.polyline(&segment, s.color, 2.0);
        }
    }
    frame(&mut svg, &area);
    axis_labels(&mut svg, &area, size, style);
    let entries: Vec<(&str, &str)> = series.iter().map(|s| (s.label, s.color)).collect();
    legend(&mut svg, &area, &entries);
    svg.finish()
}

// ******** The charts of the report ********

pub(crate) fn county_turnout_svg(
    aggs: &Aggregates,
    style: &ChartStyle,
    size: (f64, f64),
    caption: &str,
) -> String {
    // Lowest turnout at the bottom.
    let rows: Vec<(String, Option<f64>)> = aggs
        .county_turnout
        .iter()
        .rev()
        .map(|g| (g.key.clone(), g.ratio))
        .collect();
    hbar_svg(size, style, &rows, caption)
}

pub(crate) fn settlement_turnout_svg(
    aggs: &Aggregates,
    style: &ChartStyle,
    size: (f64, f64),
    caption: &str,
) -> String {
    let cats: Vec<(String, Option<f64>)> = aggs
        .settlement_turnout
        .iter()
        .map(|g| (g.key.label().to_string(), g.ratio))
        .collect();
    vbar_svg(size, style, &cats, caption)
}

pub(crate) fn sex_totals_svg(aggs: &Aggregates, style: &ChartStyle, size: (f64, f64)) -> String {
    let t = &aggs.sex_totals;
    let cats = vec![
        (
            series_label(style, 0, "Barbati").to_string(),
            Some(t.male as f64),
        ),
        (
            series_label(style, 1, "Femei").to_string(),
            Some(t.female as f64),
        ),
    ];
    // Always two categories: there is nothing to fall back to.
    vbar_svg(size, style, &cats, "")
}

pub(crate) fn age_distribution_svg(
    aggs: &Aggregates,
    style: &ChartStyle,
    size: (f64, f64),
    caption: &str,
) -> String {
    let buckets = &aggs.age_distribution.buckets;
    let series = [
        LineSeries {
            label: series_label(style, 0, "Femei"),
            color: color(&style.colors, 0),
            points: buckets
                .iter()
                .map(|b| (b.age as f64, b.female.map(|c| c as f64)))
                .collect(),
        },
        LineSeries {
            label: series_label(style, 1, "Barbati"),
            color: color(&style.colors, 1),
            points: buckets
                .iter()
                .map(|b| (b.age as f64, b.male.map(|c| c as f64)))
                .collect(),
        },
    ];
    line_svg(
        size,
        style,
        (FIRST_AGE as f64, LAST_AGE as f64),
        &series,
        caption,
    )
}

pub(crate) fn top_localities_svg(
    aggs: &Aggregates,
    style: &ChartStyle,
    size: (f64, f64),
    caption: &str,
) -> String {
    // Best turnout at the top.
    let rows: Vec<(String, Option<f64>)> = aggs
        .top_localities
        .iter()
        .map(|l| (l.locality.clone(), Some(l.ratio)))
        .collect();
    hbar_svg(size, style, &rows, caption)
}

pub(crate) fn sex_by_county_svg(
    aggs: &Aggregates,
    style: &ChartStyle,
    size: (f64, f64),
    caption: &str,
) -> String {
    // Fewest women at the bottom.
    let rows: Vec<(String, [f64; 2])> = aggs
        .sex_by_county
        .iter()
        .rev()
        .map(|c| (c.county.clone(), [c.male as f64, c.female as f64]))
        .collect();
    grouped_hbar_svg(
        size,
        style,
        &rows,
        [
            series_label(style, 0, "Barbati"),
            series_label(style, 1, "Femei"),
        ],
        caption,
    )
}
