use crate::*;
use futures::executor::block_on;
use serde_json::json;

fn parse(text: &str) -> Flowchart {
    Engine::new().parse_flowchart_sync(text).unwrap()
}

fn parse_err(text: &str) -> Error {
    Engine::new().parse_flowchart_sync(text).unwrap_err()
}

#[test]
fn parse_flowchart_basic_graph() {
    let engine = Engine::new();
    let res = block_on(engine.parse_flowchart("graph TD;A-->B;")).unwrap();
    assert_eq!(
        serde_json::to_value(&res).unwrap(),
        json!({
            "keyword": "graph",
            "direction": "TB",
            "nodes": [
                { "id": "A", "label": "A", "shape": "rect", "classes": [], "styles": [] },
                { "id": "B", "label": "B", "shape": "rect", "classes": [], "styles": [] }
            ],
            "edges": [
                { "id": "L_A_B_0", "from": "A", "to": "B", "label": null, "start": "none", "end": "arrow", "stroke": "normal", "length": 1, "styles": [] }
            ],
            "subgraphs": [],
            "classDefs": {},
            "edgeDefaultStyles": []
        })
    );
}

#[test]
fn parse_flowchart_header_directions() {
    assert_eq!(parse("flowchart LR\nA").direction, Direction::LR);
    assert_eq!(parse("graph RL\nA").direction, Direction::RL);
    assert_eq!(parse("graph BT\nA").direction, Direction::BT);
    assert_eq!(parse("graph TD\nA").direction, Direction::TB);
    assert_eq!(parse("graph\nA").direction, Direction::TB);
    assert_eq!(parse("flowchart TB\nA").keyword, "flowchart");
}

#[test]
fn parse_flowchart_shapes_as_emitted_by_generators() {
    let res = parse(
        r#"flowchart TD
  s(["Start"]) --> r["Process"]
  r --> io[/ "Hello World" /]
  io --> d{ "x > 0?" }
  d -->|Yes| db[("Store")]
  d -- No --> e([End])
  db --> h{{"Prepare"}} --> c(("Join")) --> sr[["Call"]]
  sr --> rd("Rounded") --> a>"Flag"] --> t[/"Trap"\] --> it[\"Inv"/] --> l[\"Left"\]"#,
    );
    let shape = |id: &str| res.node(id).unwrap().shape;
    assert_eq!(shape("s"), NodeShape::Stadium);
    assert_eq!(shape("r"), NodeShape::Rect);
    assert_eq!(shape("io"), NodeShape::LeanRight);
    assert_eq!(shape("d"), NodeShape::Diamond);
    assert_eq!(shape("db"), NodeShape::Cylinder);
    assert_eq!(shape("e"), NodeShape::Stadium);
    assert_eq!(shape("h"), NodeShape::Hexagon);
    assert_eq!(shape("c"), NodeShape::Circle);
    assert_eq!(shape("sr"), NodeShape::Subroutine);
    assert_eq!(shape("rd"), NodeShape::Round);
    assert_eq!(shape("a"), NodeShape::Asymmetric);
    assert_eq!(shape("t"), NodeShape::Trapezoid);
    assert_eq!(shape("it"), NodeShape::InvTrapezoid);
    assert_eq!(shape("l"), NodeShape::LeanLeft);

    assert_eq!(res.node("io").unwrap().label, "Hello World");
    assert_eq!(res.node("d").unwrap().label, "x > 0?");
    assert_eq!(res.node("e").unwrap().label, "End");
}

#[test]
fn parse_flowchart_arrow_variants() {
    let res = parse(
        "graph LR\nA --> B\nA --- C\nA -.-> D\nA ==> E\nA ---> F\nA -..-> G\nA --x H\nA --o I\nA <--> J\nA ~~~ K\nA === L",
    );
    let kinds: Vec<_> = res
        .edges
        .iter()
        .map(|e| (e.to.as_str(), e.start, e.end, e.stroke, e.length))
        .collect();
    assert_eq!(
        kinds,
        vec![
            ("B", ArrowHead::None, ArrowHead::Arrow, Stroke::Normal, 1),
            ("C", ArrowHead::None, ArrowHead::None, Stroke::Normal, 1),
            ("D", ArrowHead::None, ArrowHead::Arrow, Stroke::Dotted, 1),
            ("E", ArrowHead::None, ArrowHead::Arrow, Stroke::Thick, 1),
            ("F", ArrowHead::None, ArrowHead::Arrow, Stroke::Normal, 2),
            ("G", ArrowHead::None, ArrowHead::Arrow, Stroke::Dotted, 2),
            ("H", ArrowHead::None, ArrowHead::Cross, Stroke::Normal, 1),
            ("I", ArrowHead::None, ArrowHead::Circle, Stroke::Normal, 1),
            ("J", ArrowHead::Arrow, ArrowHead::Arrow, Stroke::Normal, 1),
            ("K", ArrowHead::None, ArrowHead::None, Stroke::Invisible, 1),
            ("L", ArrowHead::None, ArrowHead::None, Stroke::Thick, 1),
        ]
    );
}

#[test]
fn parse_flowchart_edge_labels_in_both_syntaxes() {
    let res = parse(
        "graph TD\nA -- Yes --> B\nA -->|No| C\nA -. maybe .-> D\nA == \"sure\" ==> E\nA ---|plain| F",
    );
    let labels: Vec<_> = res.edges.iter().map(|e| e.label.as_deref()).collect();
    assert_eq!(
        labels,
        vec![Some("Yes"), Some("No"), Some("maybe"), Some("sure"), Some("plain")]
    );
    assert_eq!(res.edges[2].stroke, Stroke::Dotted);
    assert_eq!(res.edges[3].stroke, Stroke::Thick);
    assert_eq!(res.edges[4].end, ArrowHead::None);
}

#[test]
fn parse_flowchart_chains_and_groups_expand_to_every_edge() {
    let res = parse("graph TD\nA & B --> C --> D & E");
    let pairs: Vec<_> = res
        .edges
        .iter()
        .map(|e| (e.from.as_str(), e.to.as_str()))
        .collect();
    assert_eq!(
        pairs,
        vec![("A", "C"), ("B", "C"), ("C", "D"), ("C", "E")]
    );
}

#[test]
fn parse_flowchart_repeated_edges_get_distinct_ids() {
    let res = parse("graph TD\nA-->B\nA-->B");
    assert_eq!(res.edges[0].id, "L_A_B_0");
    assert_eq!(res.edges[1].id, "L_A_B_1");
}

#[test]
fn parse_flowchart_later_declaration_overrides_label_and_shape() {
    let res = parse("graph TD\nA[One] --> B\nA(Two)");
    let a = res.node("A").unwrap();
    assert_eq!(a.label, "Two");
    assert_eq!(a.shape, NodeShape::Round);
    // Plain references keep the earlier declaration.
    let res = parse("graph TD\nA[One] --> B\nB --> A");
    assert_eq!(res.node("A").unwrap().label, "One");
}

#[test]
fn parse_flowchart_hyphenated_ids_and_comments() {
    let res = parse("graph TD\n%% leading comment\nnode-1 --> node-2 %% trailing\n");
    assert_eq!(res.nodes.len(), 2);
    assert_eq!(res.edges[0].from, "node-1");
    assert_eq!(res.edges[0].to, "node-2");
}

#[test]
fn parse_flowchart_nested_subgraphs() {
    let res = parse(
        "graph TB\n  subgraph outer [Outer]\n    direction LR\n    a1 --> a2\n    subgraph inner\n      b1\n    end\n    a2 --> b1\n  end\n  c --> a1",
    );
    assert_eq!(res.direction, Direction::TB);
    assert_eq!(res.subgraphs.len(), 2);

    let inner = &res.subgraphs[0];
    assert_eq!(inner.id, "inner");
    assert_eq!(inner.title, "inner");
    assert_eq!(inner.nodes, vec!["b1".to_string()]);

    let outer = &res.subgraphs[1];
    assert_eq!(outer.id, "outer");
    assert_eq!(outer.title, "Outer");
    assert_eq!(outer.direction, Some(Direction::LR));
    assert_eq!(outer.nodes, vec!["a1".to_string(), "a2".to_string()]);
    assert_eq!(outer.children, vec!["inner".to_string()]);
    assert_eq!(res.edges.len(), 3);
}

#[test]
fn parse_flowchart_untitled_subgraphs_get_generated_ids() {
    let res = parse("graph TD\nsubgraph \"Two words\"\nA\nend\nsubgraph Three more words\nB\nend");
    assert_eq!(res.subgraphs[0].id, "subGraph0");
    assert_eq!(res.subgraphs[0].title, "Two words");
    assert_eq!(res.subgraphs[1].id, "subGraph1");
    assert_eq!(res.subgraphs[1].title, "Three more words");
}

#[test]
fn parse_flowchart_styles_and_classes() {
    let res = parse(
        "graph TD\n  A:::hot --> B\n  classDef hot fill:#f96,stroke:#333\n  class B hot\n  style A stroke-width:4px\n  linkStyle 0 stroke:red\n  linkStyle default stroke-width:2px\n  click A callback",
    );
    let a = res.node("A").unwrap();
    assert_eq!(a.classes, vec!["hot".to_string()]);
    assert_eq!(
        res.resolved_node_styles(a),
        vec![
            "fill:#f96".to_string(),
            "stroke:#333".to_string(),
            "stroke-width:4px".to_string()
        ]
    );
    assert_eq!(res.node("B").unwrap().classes, vec!["hot".to_string()]);
    assert_eq!(res.edges[0].styles, vec!["stroke:red".to_string()]);
    assert_eq!(res.edge_default_styles, vec!["stroke-width:2px".to_string()]);
    assert_eq!(res.nodes.len(), 2);
}

#[test]
fn parse_flowchart_strips_code_fences() {
    let plain = parse("graph TD\nA-->B");
    let fenced = parse("```mermaid\ngraph TD\nA-->B\n```");
    let crlf = parse("graph TD\r\nA-->B\r\n");
    assert_eq!(plain, fenced);
    assert_eq!(plain, crlf);
}

#[test]
fn parse_flowchart_empty_input_is_an_error() {
    assert_eq!(parse_err(""), Error::EmptyDiagram);
    assert_eq!(parse_err("  \n%% only a comment\n"), Error::EmptyDiagram);
    assert_eq!(parse_err("```mermaid\n```"), Error::EmptyDiagram);
}

#[test]
fn parse_flowchart_missing_header_is_reported() {
    assert_eq!(
        parse_err("A-->B"),
        Error::UnsupportedHeader {
            line: 1,
            header: "A-->B".to_string()
        }
    );
    assert!(matches!(
        parse_err("sequenceDiagram\nA->>B: hi"),
        Error::UnsupportedHeader { line: 1, .. }
    ));
}

#[test]
fn parse_flowchart_unterminated_node_label_reports_line() {
    let err = parse_err("graph TD\nA --> B\nB[Start --> C");
    let Error::DiagramParse { line, message } = err else {
        panic!("expected a parse error");
    };
    assert_eq!(line, 3);
    assert!(message.contains("unterminated node label"), "{message}");
}

#[test]
fn parse_flowchart_unquoted_special_characters_are_rejected() {
    let err = parse_err("graph TD\nA[call(x)] --> B");
    assert!(
        matches!(&err, Error::DiagramParse { line: 2, message } if message.contains("double quotes")),
        "{err}"
    );
    // Quoting makes the same label valid.
    let res = parse("graph TD\nA[\"call(x)\"] --> B");
    assert_eq!(res.node("A").unwrap().label, "call(x)");
}

#[test]
fn parse_flowchart_unterminated_edge_label_reports_line() {
    let err = parse_err("graph TD\nA -->|Yes B");
    assert!(matches!(err, Error::DiagramParse { line: 2, .. }), "{err}");

    let err = parse_err("graph TD\nA -- Yes B");
    assert!(matches!(err, Error::DiagramParse { line: 2, .. }), "{err}");
}

#[test]
fn parse_flowchart_unknown_statements_are_errors() {
    let err = parse_err("graph TD\nA-->B\n!!");
    assert!(matches!(err, Error::DiagramParse { line: 3, .. }), "{err}");

    let err = parse_err("graph TD\nA-->\n");
    assert!(matches!(err, Error::DiagramParse { line: 2, .. }), "{err}");

    let err = parse_err("graph TD\nA-->B\nend");
    assert!(matches!(err, Error::DiagramParse { line: 3, .. }), "{err}");

    let err = parse_err("graph TD\nsubgraph one\nA");
    assert!(matches!(err, Error::DiagramParse { .. }), "{err}");
}

#[test]
fn parse_flowchart_link_style_index_out_of_range() {
    let err = parse_err("graph TD\nA-->B\nlinkStyle 3 stroke:red");
    assert!(
        matches!(&err, Error::DiagramParse { line: 3, message } if message.contains("out of bounds")),
        "{err}"
    );
}

#[test]
fn parse_errors_display_line_numbers() {
    let err = parse_err("graph TD\nA -->|Yes B");
    assert!(err.to_string().starts_with("Parse error on line 2:"), "{err}");
}
