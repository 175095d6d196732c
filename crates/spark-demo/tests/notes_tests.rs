use pretty_assertions::assert_eq;
use serde_json::json;
use spark_demo::{DemoError, Note, NotesBoard, Notifier, Toast, ToastLevel, Toaster, NOTES_KEY};
use spark_demo::spawn_write_failure_toasts;
use spark_host::Host;
use spark_kv::KvStore;
use spark_test_utils::{test_host, ControlledStore, ScriptedLlm, StoreWrite};
use std::sync::Arc;
use std::time::Duration;

fn board_over(store: &Arc<ControlledStore>) -> (Host, NotesBoard, Arc<Toaster>) {
    let kv: Arc<dyn KvStore> = store.clone();
    let host = test_host(Arc::new(ScriptedLlm::new()), kv);
    let toaster = Arc::new(Toaster::new());
    let board = NotesBoard::new(&host, toaster.clone()).unwrap();
    (host, board, toaster)
}

fn stored_texts(store: &ControlledStore) -> Vec<String> {
    let value = store.peek(NOTES_KEY).unwrap_or_else(|| json!([]));
    let notes: Vec<Note> = serde_json::from_value(value).unwrap();
    notes.into_iter().map(|note| note.text).collect()
}

fn texts(board: &NotesBoard) -> Vec<String> {
    board.notes().iter().map(|note| note.text.clone()).collect()
}

#[tokio::test]
async fn add_two_then_delete_first() {
    let store = Arc::new(ControlledStore::new());
    let (host, board, toaster) = board_over(&store);
    board.ready().await;

    let milk = board.add_note("Buy milk").unwrap();
    board.add_note("Call Bob").unwrap();
    assert_eq!(texts(&board), vec!["Buy milk", "Call Bob"]);

    assert!(board.delete_note(&milk.id).unwrap());
    assert_eq!(texts(&board), vec!["Call Bob"]);

    host.kv().flush().await;
    assert_eq!(stored_texts(&store), vec!["Call Bob"]);

    let messages: Vec<String> = toaster.toasts().into_iter().map(|t| t.message).collect();
    assert_eq!(messages, vec!["Note saved!", "Note saved!", "Note deleted"]);
}

#[tokio::test]
async fn note_text_is_trimmed() {
    let store = Arc::new(ControlledStore::new());
    let (_host, board, _toaster) = board_over(&store);
    board.ready().await;

    let note = board.add_note("  Water plants \n").unwrap();
    assert_eq!(note.text, "Water plants");
}

#[tokio::test]
async fn whitespace_note_is_rejected() {
    let store = Arc::new(ControlledStore::new());
    let (host, board, toaster) = board_over(&store);
    board.ready().await;

    let err = board.add_note("   ").unwrap_err();
    assert!(matches!(err, DemoError::EmptyInput { field: "note text" }));
    assert!(board.is_empty());

    host.kv().flush().await;
    assert!(store.writes().is_empty());
    assert_eq!(toaster.last(), Some(Toast::error("Please enter some text")));
}

#[tokio::test]
async fn deleting_unknown_id_writes_nothing() {
    let store = Arc::new(ControlledStore::new());
    let (host, board, toaster) = board_over(&store);
    board.ready().await;
    board.add_note("keep me").unwrap();
    host.kv().flush().await;
    let writes_before = store.writes().len();

    assert!(!board.delete_note("no-such-id").unwrap());
    host.kv().flush().await;

    assert_eq!(board.len(), 1);
    assert_eq!(store.writes().len(), writes_before);
    assert_eq!(toaster.last(), Some(Toast::success("Note saved!")));
}

#[tokio::test]
async fn rapid_adds_while_writes_pending_keep_both() {
    let store = Arc::new(ControlledStore::new());
    let (host, board, _toaster) = board_over(&store);
    board.ready().await;

    store.hold_writes();
    board.add_note("A").unwrap();
    board.add_note("B").unwrap();
    assert_eq!(texts(&board), vec!["A", "B"]);

    store.release_writes();
    host.kv().flush().await;
    assert_eq!(stored_texts(&store), vec!["A", "B"]);
}

#[tokio::test]
async fn add_before_load_is_applied_on_top_of_stored_notes() {
    let stored = json!([{"id": "01", "text": "from last visit", "createdAt": 1_700_000_000_000_i64}]);
    let store = Arc::new(ControlledStore::with_entries([(NOTES_KEY, stored)]));
    store.hold_reads();
    let (host, board, _toaster) = board_over(&store);

    board.add_note("typed early").unwrap();
    assert_eq!(texts(&board), vec!["typed early"]);

    store.release_reads();
    board.ready().await;
    assert_eq!(texts(&board), vec!["from last visit", "typed early"]);

    host.kv().flush().await;
    assert_eq!(stored_texts(&store), vec!["from last visit", "typed early"]);
}

#[tokio::test]
async fn notes_survive_a_new_session() {
    let store = Arc::new(ControlledStore::new());
    {
        let (host, board, _toaster) = board_over(&store);
        board.ready().await;
        board.add_note("persisted").unwrap();
        host.kv().flush().await;
    }

    let (_host, board, _toaster) = board_over(&store);
    let notes = board.ready().await;
    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0].text, "persisted");
}

#[tokio::test]
async fn failed_write_keeps_note_and_warns() {
    let store = Arc::new(ControlledStore::new());
    let (host, board, toaster) = board_over(&store);
    let notifier: Arc<dyn Notifier> = toaster.clone();
    let listener = spawn_write_failure_toasts(host.kv(), notifier);
    board.ready().await;

    store.fail_writes(true);
    board.add_note("offline note").unwrap();
    host.kv().flush().await;

    tokio::time::timeout(Duration::from_secs(1), async {
        while !toaster
            .toasts()
            .iter()
            .any(|toast| toast.level == ToastLevel::Warning)
        {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .unwrap();

    assert_eq!(texts(&board), vec!["offline note"]);
    assert_eq!(
        toaster.last(),
        Some(Toast::warning(format!("Changes to {NOTES_KEY} could not be saved")))
    );
    listener.abort();
}
