use crate::generation::generate_bundle;
use crate::*;
use futures::executor::block_on;
use std::result::Result;

struct Canned(Result<String, GenerationError>);

impl TextGenerator for Canned {
    async fn generate(&self, _source_code: &str) -> Result<String, GenerationError> {
        self.0.clone()
    }
}

const RESPONSE: &str = r#"{"flowchart":"graph TD\nA([\"Start\"]) --> B([\"End\"])","algorithm":"1. Start 2. End","pseudoCode":"START\nEND"}"#;

#[test]
fn parse_generation_response_plain_json() {
    let bundle = parse_generation_response(RESPONSE).unwrap();
    assert_eq!(bundle.flowchart, "graph TD\nA([\"Start\"]) --> B([\"End\"])");
    assert_eq!(bundle.algorithm, "1. Start 2. End");
    assert_eq!(bundle.pseudo_code, "START\nEND");
}

#[test]
fn parse_generation_response_strips_json_fences() {
    let fenced = format!("```json\n{RESPONSE}\n```");
    assert_eq!(
        parse_generation_response(&fenced).unwrap(),
        parse_generation_response(RESPONSE).unwrap()
    );
}

#[test]
fn parse_generation_response_requires_exactly_three_fields() {
    let missing = r#"{"flowchart":"graph TD","algorithm":"1. A"}"#;
    assert!(matches!(
        parse_generation_response(missing),
        Err(GenerationError::MalformedResponse { .. })
    ));

    let extra = r#"{"flowchart":"graph TD","algorithm":"1. A","pseudoCode":"A","notes":"x"}"#;
    assert!(matches!(
        parse_generation_response(extra),
        Err(GenerationError::MalformedResponse { .. })
    ));

    let wrong_type = r#"{"flowchart":"graph TD","algorithm":["1. A"],"pseudoCode":"A"}"#;
    assert!(matches!(
        parse_generation_response(wrong_type),
        Err(GenerationError::MalformedResponse { .. })
    ));

    assert!(matches!(
        parse_generation_response("Sorry, I can't help with that."),
        Err(GenerationError::MalformedResponse { .. })
    ));
}

#[test]
fn upstream_429_maps_to_rate_limited() {
    let err = GenerationError::from_upstream_message("[429 Too Many Requests] quota exceeded");
    assert_eq!(err, GenerationError::RateLimited);
    assert!(err.to_string().contains("wait about 60 seconds"));

    let err = GenerationError::from_upstream_message("network down");
    assert_eq!(err.to_string(), "network down");
}

#[test]
fn generate_bundle_validates_the_response() {
    let ok = Canned(Ok(format!("```json\n{RESPONSE}\n```")));
    let bundle = block_on(generate_bundle(&ok, "print(1)")).unwrap();
    assert_eq!(bundle.pseudo_code, "START\nEND");

    let upstream = Canned(Err(GenerationError::RateLimited));
    assert_eq!(
        block_on(generate_bundle(&upstream, "print(1)")),
        Err(GenerationError::RateLimited)
    );

    let garbage = Canned(Ok("{}".to_string()));
    assert!(matches!(
        block_on(generate_bundle(&garbage, "print(1)")),
        Err(GenerationError::MalformedResponse { .. })
    ));
}

#[test]
fn generated_flowchart_parses() {
    let bundle = parse_generation_response(RESPONSE).unwrap();
    let chart = Engine::new().parse_flowchart_sync(&bundle.flowchart).unwrap();
    assert_eq!(chart.nodes.len(), 2);
    assert_eq!(chart.node("A").unwrap().shape, NodeShape::Stadium);
}
