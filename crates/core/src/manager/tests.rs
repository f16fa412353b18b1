use std::sync::{Arc, Mutex};
use std::time::Duration;

use parlor_model::{
    ConversationCatalog, ConversationRecord, Message, Role, RunStatus,
};
use parlor_store::{ConversationStore, MemoryStore};
use parlor_test_backend::{Operation, ScriptedRun, TestBackend};
use tokio::sync::watch;
use tokio::time::{sleep, timeout};

use crate::{
    APOLOGY_TEXT, AssistantDirectory, CONFIGURATION_ERROR_TEXT,
    ConversationManager, ManagerBuilder, PollPolicy,
};

fn directory() -> AssistantDirectory {
    AssistantDirectory::new()
        .with_assistant("A", "asst_a")
        .with_assistant("B", "asst_b")
        .with_assistant("Sem ID", "")
}

fn manager(backend: &TestBackend, store: &MemoryStore) -> ConversationManager {
    ManagerBuilder::with_backend(backend.clone())
        .with_store(store.clone())
        .with_directory(directory())
        .build()
}

#[tokio::test(start_paused = true)]
async fn test_idle_after_reply() {
    let backend = TestBackend::default();
    backend.add_run(ScriptedRun::completed_with_text("Oi, tudo bem?"));

    let (idle_tx, mut idle_rx) = watch::channel::<usize>(0);
    let manager = ManagerBuilder::with_backend(backend)
        .with_directory(directory())
        .on_idle(move || {
            idle_tx.send_modify(|count| *count += 1);
        })
        .build();
    // The initial load ends with the manager idle.
    timeout(Duration::from_secs(5), idle_rx.wait_for(|v| *v >= 1))
        .await
        .unwrap()
        .unwrap();

    let answer = manager.send_user_turn("Olá").await.unwrap().unwrap();
    assert_eq!(answer.role, Role::Assistant);
    assert_eq!(answer.text(), Some("Oi, tudo bem?"));
    timeout(Duration::from_secs(5), idle_rx.wait_for(|v| *v >= 2))
        .await
        .unwrap()
        .unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_trigger_opens_conversation() {
    let backend = TestBackend::default();
    backend.add_run(ScriptedRun::completed_with_text("Bem-vindo!"));
    let store = MemoryStore::new();
    let manager = manager(&backend, &store);

    let answer = manager.send_trigger().await.unwrap().unwrap();
    assert_eq!(answer.text(), Some("Bem-vindo!"));

    let snapshot = manager.snapshot().await.unwrap();
    assert_eq!(snapshot.label, "A");
    assert!(!snapshot.busy);
    assert_eq!(snapshot.messages.len(), 2);
    assert_eq!(snapshot.messages[0].role, Role::User);
    assert_eq!(snapshot.messages[0].text(), Some("COMEÇAR"));
    assert_eq!(snapshot.messages[1], answer);

    let catalog = store.catalog().await.unwrap();
    let record = catalog.get("A").unwrap();
    assert_eq!(record.assistant_id, "asst_a");
    assert!(record.thread_id.as_deref().is_some_and(|id| !id.is_empty()));
    assert_eq!(record.messages.len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_sends_reuse_thread() {
    let backend = TestBackend::default();
    backend.add_run(ScriptedRun::completed_with_text("Primeira"));
    backend.add_run(ScriptedRun::completed_with_text("Segunda"));
    let store = MemoryStore::new();
    let manager = manager(&backend, &store);

    manager.send_user_turn("um").await.unwrap();
    let first = manager.snapshot().await.unwrap().thread_id;
    manager.send_user_turn("dois").await.unwrap();
    let snapshot = manager.snapshot().await.unwrap();

    assert!(first.is_some());
    assert_eq!(snapshot.thread_id, first);
    assert_eq!(snapshot.messages.len(), 4);
    assert_eq!(backend.calls().create_thread, 1);
}

#[tokio::test(start_paused = true)]
async fn test_polls_until_completed() {
    let backend = TestBackend::default();
    backend.add_run(ScriptedRun::completed_with_text("Pronto").with_statuses([
        RunStatus::Queued,
        RunStatus::Queued,
        RunStatus::Queued,
        RunStatus::Completed,
    ]));
    let manager = manager(&backend, &MemoryStore::new());

    let answer = manager.send_user_turn("Oi").await.unwrap().unwrap();
    assert_eq!(answer.text(), Some("Pronto"));
    assert_eq!(backend.calls().retrieve_run, 4);
    assert_eq!(backend.calls().list_messages, 1);
}

#[tokio::test(start_paused = true)]
async fn test_failed_run_apologizes() {
    for status in [RunStatus::Failed, RunStatus::Expired] {
        let backend = TestBackend::default();
        backend.add_run(ScriptedRun::ending_with(status));
        let store = MemoryStore::new();
        let manager = manager(&backend, &store);

        let answer = manager.send_user_turn("Oi").await.unwrap().unwrap();
        assert_eq!(answer.text(), Some(APOLOGY_TEXT));

        let snapshot = manager.snapshot().await.unwrap();
        assert_eq!(snapshot.messages.len(), 2);
        assert_eq!(snapshot.messages[1], answer);
        let catalog = store.catalog().await.unwrap();
        assert_eq!(catalog.get("A").unwrap().messages.len(), 2);
    }
}

#[tokio::test(start_paused = true)]
async fn test_timeout_apologizes() {
    let backend = TestBackend::default();
    backend.add_run(ScriptedRun::ending_with(RunStatus::InProgress));
    let manager = ManagerBuilder::with_backend(backend.clone())
        .with_directory(directory())
        .with_poll_policy(PollPolicy::unbounded().with_max_attempts(3))
        .build();

    let answer = manager.send_user_turn("Oi").await.unwrap().unwrap();
    assert_eq!(answer.text(), Some(APOLOGY_TEXT));
    assert_eq!(backend.calls().retrieve_run, 3);
}

#[tokio::test(start_paused = true)]
async fn test_blank_input() {
    let backend = TestBackend::default();
    let store = MemoryStore::new();
    let manager = manager(&backend, &store);

    assert_eq!(manager.send_user_turn("").await.unwrap(), None);
    assert_eq!(manager.send_user_turn("  \n\t").await.unwrap(), None);

    let snapshot = manager.select_assistant("A").await.unwrap();
    assert!(snapshot.messages.is_empty());
    assert_eq!(backend.calls().total(), 0);
    assert!(store.catalog().await.unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_turn_is_trimmed() {
    let backend = TestBackend::default();
    backend.add_run(ScriptedRun::completed_with_text("Pronto"));
    let store = MemoryStore::new();
    let manager = manager(&backend, &store);

    manager.send_user_turn("  Oi \n").await.unwrap().unwrap();

    let snapshot = manager.snapshot().await.unwrap();
    assert_eq!(snapshot.messages[0].text(), Some("Oi"));
    let thread_id = snapshot.thread_id.unwrap();
    let sent = backend.thread_messages(&thread_id).unwrap();
    assert_eq!(sent[0].content[0].as_text(), Some("Oi"));
    let catalog = store.catalog().await.unwrap();
    assert_eq!(catalog.get("A").unwrap().messages[0].text(), Some("Oi"));
}

#[tokio::test(start_paused = true)]
async fn test_restart_restores_conversation() {
    let backend = TestBackend::default();
    backend.add_run(ScriptedRun::completed_with_text("Anotado."));
    let store = MemoryStore::new();

    let before = {
        let manager = manager(&backend, &store);
        manager.send_user_turn("Lembre disso").await.unwrap();
        let snapshot = manager.snapshot().await.unwrap();
        manager.shutdown();
        snapshot
    };

    let manager = manager(&backend, &store);
    let after = manager.select_assistant("A").await.unwrap();
    assert_eq!(after.messages, before.messages);
    assert_eq!(after.thread_id, before.thread_id);
    assert!(after.thread_id.is_some());
}

#[tokio::test(start_paused = true)]
async fn test_clear_starts_new_thread() {
    let backend = TestBackend::default();
    backend.add_run(ScriptedRun::completed_with_text("Um"));
    backend.add_run(ScriptedRun::completed_with_text("Dois"));
    let store = MemoryStore::new();
    let manager = manager(&backend, &store);

    manager.send_user_turn("primeiro").await.unwrap();
    let old_thread = manager.snapshot().await.unwrap().thread_id.unwrap();

    manager.clear_active().await.unwrap();
    let snapshot = manager.snapshot().await.unwrap();
    assert!(snapshot.messages.is_empty());
    assert_eq!(snapshot.thread_id, None);
    // The entry is gone, not merely emptied.
    assert!(!store.catalog().await.unwrap().contains("A"));

    manager.send_user_turn("de novo").await.unwrap();
    let new_thread = manager.snapshot().await.unwrap().thread_id.unwrap();
    assert_ne!(new_thread, old_thread);
    assert_eq!(backend.calls().create_thread, 2);
    let catalog = store.catalog().await.unwrap();
    assert_eq!(catalog.get("A").unwrap().messages.len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_unconfigured_assistant() {
    let backend = TestBackend::default();
    let store = MemoryStore::new();
    let manager = manager(&backend, &store);

    for label in ["Sem ID", "Desconhecido"] {
        manager.select_assistant(label).await.unwrap();
        let answer = manager.send_user_turn("Oi").await.unwrap().unwrap();
        assert_eq!(answer.text(), Some(CONFIGURATION_ERROR_TEXT));

        let snapshot = manager.snapshot().await.unwrap();
        assert_eq!(snapshot.messages.len(), 2);
        assert_eq!(snapshot.thread_id, None);
    }
    assert_eq!(backend.calls().total(), 0);
    let catalog = store.catalog().await.unwrap();
    assert_eq!(catalog.get("Sem ID").unwrap().assistant_id, "");
}

#[tokio::test(start_paused = true)]
async fn test_export_keyword() {
    let backend = TestBackend::default();
    let store = MemoryStore::new();
    let exported = Arc::new(Mutex::new(vec![]));
    let manager = ManagerBuilder::with_backend(backend.clone())
        .with_store(store.clone())
        .with_directory(directory())
        .with_exporter({
            let exported = Arc::clone(&exported);
            move |label: &str, messages: &[Message]| {
                let texts: Vec<_> = messages
                    .iter()
                    .filter_map(|m| m.text().map(ToOwned::to_owned))
                    .collect();
                exported.lock().unwrap().push((label.to_owned(), texts));
            }
        })
        .build();

    let answer = manager.send_user_turn("Gerar documento, por favor").await;
    assert_eq!(answer.unwrap(), None);

    assert_eq!(
        *exported.lock().unwrap(),
        [("A".to_owned(), vec!["Gerar documento, por favor".to_owned()])]
    );
    assert_eq!(backend.calls().total(), 0);
    let catalog = store.catalog().await.unwrap();
    assert_eq!(catalog.get("A").unwrap().messages.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_commands_run_in_order() {
    let mut backend = TestBackend::default();
    backend.set_delay(Duration::from_millis(100));
    backend.add_run(ScriptedRun::completed_with_text("resposta um"));
    backend.add_run(ScriptedRun::completed_with_text("resposta dois"));

    let seen = Arc::new(Mutex::new(vec![]));
    let manager = ManagerBuilder::with_backend(backend.clone())
        .with_directory(directory())
        .on_message({
            let seen = Arc::clone(&seen);
            move |msg| {
                let text = msg.text().unwrap_or_default().to_owned();
                seen.lock().unwrap().push(text);
            }
        })
        .build();

    // `join!` polls in order, so the commands are queued in this order
    // while the first exchange is still in flight.
    let (first, second, cleared) = tokio::join!(
        manager.send_user_turn("um"),
        manager.send_user_turn("dois"),
        manager.clear_active(),
    );
    assert_eq!(first.unwrap().unwrap().text(), Some("resposta um"));
    assert_eq!(second.unwrap().unwrap().text(), Some("resposta dois"));
    cleared.unwrap();

    assert_eq!(
        *seen.lock().unwrap(),
        ["um", "resposta um", "dois", "resposta dois"]
    );
    assert_eq!(backend.calls().create_thread, 1);
    assert!(manager.snapshot().await.unwrap().messages.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_snapshot_while_busy() {
    let mut backend = TestBackend::default();
    backend.set_delay(Duration::from_secs(2));
    backend.add_run(ScriptedRun::completed_with_text("Demorou"));
    let manager = manager(&backend, &MemoryStore::new());
    manager.select_assistant("A").await.unwrap();

    let sending = tokio::spawn({
        let manager = manager.clone();
        async move { manager.send_user_turn("Oi").await }
    });
    sleep(Duration::from_millis(500)).await;

    // The user's turn is visible before the reply arrives.
    let snapshot = manager.snapshot().await.unwrap();
    assert!(snapshot.busy);
    assert_eq!(snapshot.messages.len(), 1);
    assert_eq!(snapshot.messages[0].text(), Some("Oi"));

    sending.await.unwrap().unwrap();
    let snapshot = manager.snapshot().await.unwrap();
    assert!(!snapshot.busy);
    assert_eq!(snapshot.messages.len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_failure_keeps_thread() {
    let backend = TestBackend::default();
    backend.add_run(ScriptedRun::completed_with_text("Agora foi"));
    let store = MemoryStore::new();
    let manager = manager(&backend, &store);

    // The thread gets created, then starting the run fails.
    backend.fail_next(Operation::CreateRun);
    let answer = manager.send_user_turn("Oi").await.unwrap().unwrap();
    assert_eq!(answer.text(), Some(APOLOGY_TEXT));
    let thread_id = manager.snapshot().await.unwrap().thread_id;
    assert!(thread_id.is_some());
    let catalog = store.catalog().await.unwrap();
    assert_eq!(catalog.get("A").unwrap().thread_id, thread_id);

    let answer = manager.send_user_turn("De novo").await.unwrap().unwrap();
    assert_eq!(answer.text(), Some("Agora foi"));
    assert_eq!(manager.snapshot().await.unwrap().thread_id, thread_id);
    assert_eq!(backend.calls().create_thread, 1);
}

#[tokio::test(start_paused = true)]
async fn test_select_switches_context() {
    let backend = TestBackend::default();
    backend.add_run(ScriptedRun::completed_with_text("Sou o A"));
    let store = MemoryStore::new();
    let manager = manager(&backend, &store);

    manager.send_user_turn("Quem é você?").await.unwrap();

    let snapshot = manager.select_assistant("B").await.unwrap();
    assert_eq!(snapshot.label, "B");
    assert!(snapshot.messages.is_empty());
    assert_eq!(snapshot.thread_id, None);
    // Selecting doesn't write anything.
    let catalog = store.catalog().await.unwrap();
    assert_eq!(catalog.len(), 1);
    assert!(!catalog.contains("B"));

    let snapshot = manager.select_assistant("A").await.unwrap();
    assert_eq!(snapshot.messages.len(), 2);
    assert_eq!(snapshot.messages[1].text(), Some("Sou o A"));
}

#[tokio::test(start_paused = true)]
async fn test_initial_assistant() {
    let mut catalog = ConversationCatalog::default();
    catalog.insert(
        "B",
        ConversationRecord {
            assistant_id: "asst_b".to_owned(),
            thread_id: Some("thread_b".to_owned()),
            messages: vec![Message::user_text("Oi, B")],
        },
    );
    let (idle_tx, mut idle_rx) = watch::channel(false);
    let manager = ManagerBuilder::with_backend(TestBackend::default())
        .with_store(MemoryStore::with_catalog(catalog))
        .with_directory(directory())
        .with_initial_assistant("B")
        .on_idle(move || {
            idle_tx.send(true).ok();
        })
        .build();

    timeout(Duration::from_secs(5), idle_rx.wait_for(|v| *v))
        .await
        .unwrap()
        .unwrap();
    let snapshot = manager.snapshot().await.unwrap();
    assert_eq!(snapshot.label, "B");
    assert_eq!(snapshot.thread_id.as_deref(), Some("thread_b"));
    assert_eq!(snapshot.messages[0].text(), Some("Oi, B"));
}
