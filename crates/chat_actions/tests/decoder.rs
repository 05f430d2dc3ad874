use chat_actions::{ActionError, TurnDecoder};
use chat_transcript::{CodeLanguage, Message, MessageGroup, TranscriptStore};
use console_api::{StreamEvent, TokenSplitter};
use pretty_assertions::assert_eq;

fn assistant_store() -> TranscriptStore {
    let mut store = TranscriptStore::empty("chat-1");
    store.append_group(MessageGroup::assistant("coder", None, Vec::new()));
    store
}

/// Feeds `chunks` through the splitter and decoder the way a streamed turn is consumed.
fn decode_chunks(chunks: &[&str]) -> (TranscriptStore, Result<(), ActionError>) {
    let mut store = assistant_store();
    let mut splitter = TokenSplitter::default();
    let mut decoder = TurnDecoder::new();

    let mut result = Ok(());
    for chunk in chunks {
        result = decoder.apply_all(&mut store, splitter.feed(chunk.as_bytes()));
        if result.is_err() {
            return (store, result);
        }
    }
    let result = decoder.apply_all(&mut store, splitter.finish());
    (store, result)
}

fn messages(store: &TranscriptStore) -> Vec<(bool, String)> {
    store
        .last_group()
        .expect("assistant group")
        .messages
        .iter()
        .map(|message| (message.is_code(), message.content().to_string()))
        .collect()
}

#[test]
fn plain_chunks_join_into_one_message() {
    let (store, result) = decode_chunks(&["Hello ", "world"]);

    result.expect("plain text is well formed");
    assert_eq!(messages(&store), vec![(false, "Hello world".to_string())]);
}

#[test]
fn code_block_becomes_code_message() {
    let (store, result) =
        decode_chunks(&["<<<< START CODE (python) >>>>", "print(1)", "<<<< END CODE >>>>"]);

    result.expect("code block is well formed");
    let group = store.last_group().expect("assistant group");
    assert_eq!(group.messages.len(), 1);
    let Message::Code(code) = &group.messages[0] else {
        panic!("expected a code message");
    };
    assert_eq!(code.language, CodeLanguage::Python);
    assert_eq!(code.content, "print(1)");
    assert!(code.outputs.is_empty());
}

#[test]
fn clear_drops_text_written_so_far() {
    let (store, result) = decode_chunks(&["abc", "<<<< CLEAR >>>>"]);

    result.expect("clear is well formed");
    assert_eq!(messages(&store), Vec::new());
}

#[test]
fn clear_removes_only_the_most_recent_message() {
    let (store, result) = decode_chunks(&[
        "intro",
        "<<<< START CODE (shell) >>>>",
        "rm -rf build",
        "<<<< CLEAR >>>>",
        "never mind",
    ]);

    result.expect("stream is well formed");
    assert_eq!(
        messages(&store),
        vec![
            (false, "intro".to_string()),
            (false, "never mind".to_string()),
        ]
    );
}

#[test]
fn repeated_end_code_is_malformed() {
    let (store, result) = decode_chunks(&[
        "<<<< START CODE (shell) >>>>",
        "ls",
        "<<<< END CODE >>>>",
        "<<<< END CODE >>>>",
    ]);

    assert!(matches!(result, Err(ActionError::MalformedStream(_))));
    assert_eq!(messages(&store), vec![(true, "ls".to_string())]);
}

#[test]
fn tokens_split_across_chunks_are_recognized() {
    let (store, result) = decode_chunks(&[
        "Run this:<<<< STA",
        "RT CODE (apple",
        "script) >>>>tell app \"Finder\"<<<< END",
        " CODE >>>>",
    ]);

    result.expect("split tokens are well formed");
    assert_eq!(
        messages(&store),
        vec![
            (false, "Run this:".to_string()),
            (true, "tell app \"Finder\"".to_string()),
        ]
    );
    let Message::Code(code) = &store.last_group().expect("group").messages[1] else {
        panic!("expected a code message");
    };
    assert_eq!(code.language, CodeLanguage::AppleScript);
}

#[test]
fn text_without_tokens_is_preserved_exactly() {
    let chunks = [
        "<<< not a token >>>",
        " <<<< START CODE (ruby) >>>>",
        " multi-byte: \u{1F980} ",
        "<<<<",
        " trailing <",
    ];
    let (store, result) = decode_chunks(&chunks);

    result.expect("no structural tokens");
    assert_eq!(messages(&store), vec![(false, chunks.concat())]);
}

#[test]
fn well_formed_streams_never_fail() {
    let streams: [&[&str]; 4] = [
        &["a", "<<<< START CODE (shell) >>>>", "ls", "<<<< END CODE >>>>", "b"],
        &["<<<< CLEAR >>>>", "<<<< CLEAR >>>>"],
        &["<<<< START CODE (python) >>>>x<<<< CLEAR >>>>y"],
        &["<<<< START CODE (python) >>>><<<< END CODE >>>><<<< START CODE (shell) >>>>pwd<<<< END CODE >>>>"],
    ];

    for chunks in streams {
        let (_, result) = decode_chunks(chunks);
        assert!(result.is_ok(), "stream {chunks:?} failed: {result:?}");
    }
}

#[test]
fn split_all_events_match_incremental_events() {
    let events = TokenSplitter::split_all("hi<<<< START CODE (shell) >>>>ls<<<< END CODE >>>>");
    assert_eq!(
        events,
        vec![
            StreamEvent::Text("hi".to_string()),
            StreamEvent::StartCode(CodeLanguage::Shell),
            StreamEvent::Text("ls".to_string()),
            StreamEvent::EndCode,
        ]
    );
}
