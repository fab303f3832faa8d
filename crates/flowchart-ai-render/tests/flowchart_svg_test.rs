use futures::executor::block_on;
use flowchart_ai_core::{Engine, FlowchartConfig};
use flowchart_ai_render::svg::{SvgRenderOptions, render_flowchart_svg};
use flowchart_ai_render::{LayoutOptions, layout};

fn render(text: &str, options: &SvgRenderOptions) -> String {
    let engine = Engine::new();
    let chart = block_on(engine.parse_flowchart(text)).expect("parse ok");
    let config = FlowchartConfig::default();
    let layout = layout(&chart, &config, &LayoutOptions::default()).expect("layout ok");
    render_flowchart_svg(&layout, &chart, &config, options)
}

fn attr<'a>(svg: &'a str, name: &str) -> &'a str {
    let needle = format!(r#" {name}=""#);
    let start = svg.find(&needle).expect("attribute present") + needle.len();
    let len = svg[start..].find('"').expect("closing quote");
    &svg[start..start + len]
}

#[test]
fn root_viewbox_matches_width_and_height() {
    let svg = render("graph TD\nA --> B", &SvgRenderOptions::default());
    assert!(svg.starts_with("<svg "));
    assert!(svg.ends_with("</svg>"));
    let width = attr(&svg, "width");
    let height = attr(&svg, "height");
    assert_eq!(attr(&svg, "viewBox"), format!("0 0 {width} {height}"));
    assert!(width.parse::<f64>().expect("numeric width") > 0.0);
}

#[test]
fn labels_are_escaped() {
    let svg = render(
        "graph TD\nA[\"x < y & z\"] -->|\"a > b\"| B",
        &SvgRenderOptions::default(),
    );
    assert!(svg.contains("x &lt; y &amp; z"));
    assert!(svg.contains("a &gt; b"));
    assert!(!svg.contains("x < y"));
}

#[test]
fn output_is_deterministic_and_uses_the_diagram_id() {
    let text = "flowchart LR\nA([Start]) --> B{Ok?}\nB -- yes --> C[(Store)]\nB -. no .-> A";
    let options = SvgRenderOptions {
        diagram_id: Some("chart-1".to_string()),
    };
    let first = render(text, &options);
    assert_eq!(first, render(text, &options));
    assert!(first.contains(r#"<svg id="chart-1""#));
    assert!(first.contains(r##"marker-end="url(#chart-1_flowchart-pointEnd)""##));
}

#[test]
fn every_shape_emits_geometry() {
    let text = "graph TD\n\
        a[rect] --> b(round) --> c([stadium]) --> d[[sub]]\n\
        d --> e[(db)] --> f((circle)) --> g{diamond} --> h{{hex}}\n\
        h --> i[/lean/] --> j[\\back\\] --> k[/trap\\] --> l[\\inv/] --> m>flag]";
    let svg = render(text, &SvgRenderOptions::default());
    assert_eq!(svg.matches(r#"<g class="node""#).count(), 13);
    assert!(svg.contains("<circle cx=\"0\" cy=\"0\""));
    assert!(svg.contains("<polygon points="));
    assert!(svg.contains("<line "));
    assert!(svg.contains(" 0,0,0 "), "cylinder outline uses arcs");
}

#[test]
fn styles_and_classes_reach_the_nodes() {
    let text = "graph TD\nA --> B\nclassDef hot fill:#f96,color:#fff\nclass A hot\nstyle B stroke:#f00\nlinkStyle 0 stroke:#0f0";
    let svg = render(text, &SvgRenderOptions::default());
    assert!(svg.contains(r#"style="fill:#f96""#));
    assert!(svg.contains(r##"fill="#fff""##));
    assert!(svg.contains(r#"style="stroke:#f00""#));
    assert!(svg.contains(r#"style="stroke:#0f0""#));
}

#[test]
fn invisible_links_carry_no_markers() {
    let svg = render("graph TD\nA ~~~ B", &SvgRenderOptions::default());
    assert!(svg.contains(r#"stroke="none""#));
    assert!(!svg.contains("marker-end="));
}

#[test]
fn subgraphs_render_as_clusters() {
    let svg = render(
        "graph TD\nsubgraph one [First group]\n  A --> B\nend",
        &SvgRenderOptions::default(),
    );
    assert!(svg.contains(r#"<g class="cluster" id="one">"#));
    assert!(svg.contains(">First group</tspan>"));
}
