//! Rendering of CSW `GetRecords` request documents.

use std::fmt::Write;

use crate::filter::FilterExpression;

/// The default number of records requested per page.
pub const DEFAULT_PAGE_SIZE: u32 = 50;

const FILTER_INDENT: usize = 8;

/// The schema the catalog renders result records in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputSchema {
    /// Dublin Core records describing series.
    Series,
    /// ISO 19139 metadata describing granules.
    Granule,
}

impl OutputSchema {
    pub fn uri(&self) -> &'static str {
        match self {
            OutputSchema::Series => "http://www.opengis.net/cat/csw/2.0.2",
            OutputSchema::Granule => "http://www.isotc211.org/2005/gmd",
        }
    }
}

/// A single page request, ready to be sent or previewed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GetRecords {
    filter: String,
    output_schema: OutputSchema,
    start_position: i64,
    max_records: u32,
}

impl GetRecords {
    /// A request for the first page of records matching `filter`.
    pub fn new(filter: &FilterExpression, output_schema: OutputSchema, max_records: u32) -> Self {
        let mut rendered = String::new();
        render_filter(filter, 0, &mut rendered);
        Self {
            filter: rendered,
            output_schema,
            start_position: 1,
            max_records,
        }
    }

    /// The same request starting at another record position.
    pub fn at(&self, start_position: i64) -> Self {
        Self {
            start_position,
            ..self.clone()
        }
    }

    pub fn start_position(&self) -> i64 {
        self.start_position
    }

    pub fn output_schema(&self) -> OutputSchema {
        self.output_schema
    }

    /// The rendered OGC filter, without the surrounding document.
    pub fn filter_xml(&self) -> &str {
        &self.filter
    }

    /// The complete request document.
    pub fn to_xml(&self) -> String {
        let mut doc = String::new();
        doc.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
        let _ = writeln!(
            doc,
            "<csw:GetRecords \
             xmlns:csw=\"http://www.opengis.net/cat/csw/2.0.2\" \
             xmlns:ogc=\"http://www.opengis.net/ogc\" \
             xmlns:gml=\"http://www.opengis.net/gml\" \
             xmlns:ows=\"http://www.opengis.net/ows\" \
             xmlns:apiso=\"http://www.opengis.net/cat/csw/apiso/1.0\" \
             service=\"CSW\" version=\"2.0.2\" resultType=\"results\" \
             startPosition=\"{}\" maxRecords=\"{}\" \
             outputFormat=\"application/json\" outputSchema=\"{}\">",
            self.start_position,
            self.max_records,
            self.output_schema.uri()
        );
        doc.push_str("  <csw:Query typeNames=\"csw:Record\">\n");
        doc.push_str("    <csw:ElementSetName>full</csw:ElementSetName>\n");
        doc.push_str("    <csw:Constraint version=\"1.1.0\">\n");
        doc.push_str("      <ogc:Filter>\n");
        let pad = " ".repeat(FILTER_INDENT);
        for line in self.filter.lines() {
            let _ = writeln!(doc, "{pad}{line}");
        }
        doc.push_str("      </ogc:Filter>\n");
        doc.push_str("    </csw:Constraint>\n");
        doc.push_str("  </csw:Query>\n");
        doc.push_str("</csw:GetRecords>\n");
        doc
    }
}

fn render_filter(expression: &FilterExpression, depth: usize, out: &mut String) {
    let pad = "  ".repeat(depth);
    match expression {
        FilterExpression::And(children) => {
            let _ = writeln!(out, "{pad}<ogc:And>");
            for child in children {
                render_filter(child, depth + 1, out);
            }
            let _ = writeln!(out, "{pad}</ogc:And>");
        },
        FilterExpression::IsSeries => {
            render_comparison(out, &pad, "PropertyIsEqualTo", "apiso:Type", "series")
        },
        FilterExpression::PropertyEquals { property, value } => render_comparison(
            out,
            &pad,
            "PropertyIsEqualTo",
            property.qualified_name(),
            value,
        ),
        FilterExpression::TimeBegins(start) => render_comparison(
            out,
            &pad,
            "PropertyIsGreaterThanOrEqualTo",
            "apiso:TempExtent_begin",
            start,
        ),
        FilterExpression::TimeEnds(end) => render_comparison(
            out,
            &pad,
            "PropertyIsLessThanOrEqualTo",
            "apiso:TempExtent_end",
            end,
        ),
        FilterExpression::BoundingBoxIntersects(bbox) => {
            let _ = writeln!(out, "{pad}<ogc:BBOX>");
            let _ = writeln!(out, "{pad}  <ogc:PropertyName>ows:BoundingBox</ogc:PropertyName>");
            let _ = writeln!(out, "{pad}  <gml:Envelope srsName=\"{}\">", escape(&bbox.crs));
            let _ = writeln!(
                out,
                "{pad}    <gml:lowerCorner>{} {}</gml:lowerCorner>",
                bbox.left, bbox.bottom
            );
            let _ = writeln!(
                out,
                "{pad}    <gml:upperCorner>{} {}</gml:upperCorner>",
                bbox.right, bbox.top
            );
            let _ = writeln!(out, "{pad}  </gml:Envelope>");
            let _ = writeln!(out, "{pad}</ogc:BBOX>");
        },
        FilterExpression::SnapshotAsOf(cutoff) => render_comparison(
            out,
            &pad,
            "PropertyIsLessThanOrEqualTo",
            "apiso:Modified",
            &cutoff.to_string(),
        ),
    }
}

fn render_comparison(out: &mut String, pad: &str, operator: &str, property: &str, literal: &str) {
    let _ = writeln!(out, "{pad}<ogc:{operator}>");
    let _ = writeln!(out, "{pad}  <ogc:PropertyName>{property}</ogc:PropertyName>");
    let _ = writeln!(out, "{pad}  <ogc:Literal>{}</ogc:Literal>", escape(literal));
    let _ = writeln!(out, "{pad}</ogc:{operator}>");
}

fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            c => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use expect_test::expect;

    use super::*;
    use crate::filter::QueryConstraints;
    use crate::types::SpatialExtent;

    // NOTE: For these `expect!` tests, run unit tests with `UPDATE_EXPECT=1`
    //  to have it automatically update the expected value when the implementation
    //  changes.

    fn granule_filter() -> FilterExpression {
        QueryConstraints {
            identifier: Some("s2a_prd_msil1c".to_string()),
            bbox: Some(SpatialExtent {
                top: 10.0,
                bottom: 5.0,
                left: 15.0,
                right: 20.5,
                crs: "EPSG:4326".to_string(),
            }),
            start: Some("2023-01-01".to_string()),
            end: None,
            as_series: false,
            snapshot_timestamp: Some("2023-02-01 10:30:00".parse().unwrap()),
        }
        .build()
        .unwrap()
    }

    #[test]
    fn renders_granule_filter() {
        let request = GetRecords::new(&granule_filter(), OutputSchema::Granule, 50);
        expect![[r#"
            <ogc:And>
              <ogc:PropertyIsEqualTo>
                <ogc:PropertyName>apiso:ParentIdentifier</ogc:PropertyName>
                <ogc:Literal>s2a_prd_msil1c</ogc:Literal>
              </ogc:PropertyIsEqualTo>
              <ogc:PropertyIsGreaterThanOrEqualTo>
                <ogc:PropertyName>apiso:TempExtent_begin</ogc:PropertyName>
                <ogc:Literal>2023-01-01</ogc:Literal>
              </ogc:PropertyIsGreaterThanOrEqualTo>
              <ogc:BBOX>
                <ogc:PropertyName>ows:BoundingBox</ogc:PropertyName>
                <gml:Envelope srsName="EPSG:4326">
                  <gml:lowerCorner>15 5</gml:lowerCorner>
                  <gml:upperCorner>20.5 10</gml:upperCorner>
                </gml:Envelope>
              </ogc:BBOX>
              <ogc:PropertyIsLessThanOrEqualTo>
                <ogc:PropertyName>apiso:Modified</ogc:PropertyName>
                <ogc:Literal>2023-02-01 10:30:00.000000</ogc:Literal>
              </ogc:PropertyIsLessThanOrEqualTo>
            </ogc:And>
        "#]]
        .assert_eq(request.filter_xml());
    }

    #[test]
    fn renders_series_document() {
        let filter = QueryConstraints::series(None).build().unwrap();
        let request = GetRecords::new(&filter, OutputSchema::Series, 10).at(11);
        expect![[r#"
            <?xml version="1.0" encoding="UTF-8"?>
            <csw:GetRecords xmlns:csw="http://www.opengis.net/cat/csw/2.0.2" xmlns:ogc="http://www.opengis.net/ogc" xmlns:gml="http://www.opengis.net/gml" xmlns:ows="http://www.opengis.net/ows" xmlns:apiso="http://www.opengis.net/cat/csw/apiso/1.0" service="CSW" version="2.0.2" resultType="results" startPosition="11" maxRecords="10" outputFormat="application/json" outputSchema="http://www.opengis.net/cat/csw/2.0.2">
              <csw:Query typeNames="csw:Record">
                <csw:ElementSetName>full</csw:ElementSetName>
                <csw:Constraint version="1.1.0">
                  <ogc:Filter>
                    <ogc:PropertyIsEqualTo>
                      <ogc:PropertyName>apiso:Type</ogc:PropertyName>
                      <ogc:Literal>series</ogc:Literal>
                    </ogc:PropertyIsEqualTo>
                  </ogc:Filter>
                </csw:Constraint>
              </csw:Query>
            </csw:GetRecords>
        "#]]
        .assert_eq(&request.to_xml());
    }

    #[test]
    fn literals_are_escaped() {
        let filter = QueryConstraints::series(Some("a<b>&\"c'".to_string()))
            .build()
            .unwrap();
        let request = GetRecords::new(&filter, OutputSchema::Series, 10);
        assert!(
            request
                .filter_xml()
                .contains("<ogc:Literal>a&lt;b&gt;&amp;&quot;c&apos;</ogc:Literal>")
        );
    }

    #[test]
    fn paging_keeps_filter_and_schema() {
        let first = GetRecords::new(&granule_filter(), OutputSchema::Granule, 50);
        let third = first.at(101);
        assert_eq!(first.start_position(), 1);
        assert_eq!(third.start_position(), 101);
        assert_eq!(third.filter_xml(), first.filter_xml());
        assert_eq!(third.output_schema(), OutputSchema::Granule);
    }
}
