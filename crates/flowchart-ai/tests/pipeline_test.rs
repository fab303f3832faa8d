use flowchart_ai::parse_generation_response;
use flowchart_ai::render::RENDER_ERROR_PREFIX;
use flowchart_ai::session::{Command, DiagramSession, Mode, ZoomStep};
use std::path::PathBuf;

fn workspace_root() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("..")
}

fn fixture(name: &str) -> String {
    let path = workspace_root().join("fixtures").join("flowchart").join(name);
    std::fs::read_to_string(&path).unwrap_or_else(|err| panic!("read {}: {err}", path.display()))
}

fn view_box_size(svg: &str) -> (f32, f32) {
    let start = svg.find("viewBox=\"").unwrap() + "viewBox=\"".len();
    let end = start + svg[start..].find('"').unwrap();
    let nums: Vec<f32> = svg[start..end]
        .split_whitespace()
        .map(|n| n.parse().unwrap())
        .collect();
    (nums[2], nums[3])
}

#[test]
fn generation_response_to_png() {
    let bundle = serde_json_response(&fixture("basic.mmd"));
    let bundle = parse_generation_response(&bundle).unwrap();

    let mut session = DiagramSession::default();
    session.dispatch(Command::ReplaceBundle(bundle));
    session.dispatch(Command::Zoom(ZoomStep::In));
    session.dispatch(Command::Zoom(ZoomStep::In));

    let diagram = session.rendered().unwrap().clone();
    assert!(diagram.svg.contains("Read n"));
    assert!(diagram.svg.contains("n &gt; 0?"));

    let image = session.export().unwrap();
    let (w, h) = view_box_size(&diagram.svg);
    // Display zoom has no influence on the export size.
    assert_eq!(image.width, (w * 5.0).ceil() as u32);
    assert_eq!(image.height, (h * 5.0).ceil() as u32);

    let decoder = png::Decoder::new(image.png.as_slice());
    let reader = decoder.read_info().unwrap();
    assert_eq!(reader.info().width, image.width);
    assert_eq!(reader.info().height, image.height);
}

#[test]
fn editing_round_trip_recovers_from_a_syntax_error() {
    let mut session = DiagramSession::default();
    session.dispatch(Command::EditSource("graph TD\n    A[\"open --> B\n".to_string()));
    assert!(
        session
            .render_error()
            .unwrap()
            .to_string()
            .starts_with(RENDER_ERROR_PREFIX)
    );

    session.dispatch(Command::ToggleMode);
    assert_eq!(session.mode(), Mode::Editing);
    session.dispatch(Command::EditSource(fixture("basic.mmd")));
    assert!(session.render_error().is_some());

    session.dispatch(Command::ToggleMode);
    assert!(session.render_error().is_none());
    assert!(session.rendered().is_some());
}

/// Wraps a diagram in the fenced JSON shape the generation service returns.
fn serde_json_response(flowchart: &str) -> String {
    let escaped = flowchart
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n");
    format!(
        "```json\n{{\"flowchart\":\"{escaped}\",\"algorithm\":\"1. Start\",\"pseudoCode\":\"READ n\"}}\n```"
    )
}
