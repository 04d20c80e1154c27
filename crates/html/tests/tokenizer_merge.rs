use html::{Token, parse, tokenize};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn character_run(tokens: &[Token]) -> String {
    tokens
        .iter()
        .filter_map(|t| match t {
            Token::Character(c) => Some(*c),
            _ => None,
        })
        .collect()
}

#[test]
fn character_tokens_round_trip() {
    init_logging();
    let inputs = [
        "plain text only",
        "multi\nline\ttext  with   spaces",
        "unicode: héllo wörld ✓",
        "a < b > c",
    ];
    for input in inputs {
        let first = tokenize(input);
        let rendered = character_run(&first);
        let second = tokenize(&rendered);
        let chars_first: Vec<&Token> = first.iter().filter(|t| matches!(t, Token::Character(_))).collect();
        let chars_second: Vec<&Token> = second.iter().filter(|t| matches!(t, Token::Character(_))).collect();
        assert_eq!(chars_first, chars_second, "round trip for {input:?}");
    }
}

#[test]
fn merged_text_node_matches_character_run() {
    init_logging();
    let input = "<p>alpha beta\ngamma</p>";
    let run = character_run(&tokenize(input));
    let doc = parse(input);
    let p = doc.first_element("p").expect("p");
    assert_eq!(doc.children(p).len(), 1);
    assert_eq!(doc.text_content(p), run);
}
