//! Per-chat event dispatch.
//!
//! One tokio task per active chat, created on first contact. Each task owns
//! that chat's [`SessionMachine`] and drains inbound texts from an
//! unbounded channel, so events for one chat are processed strictly in
//! arrival order while chats run concurrently. The only cross-chat shared
//! state is the two stores.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{info, warn};

use bucket_core::{IdGenerator, SessionMachine};
use bucket_store::{ConceptArchive, SessionCache};

use crate::telegram::TelegramClient;

/// Routes inbound events to per-chat session tasks.
pub struct Dispatcher {
    archive: ConceptArchive,
    cache: SessionCache,
    ids: Arc<IdGenerator>,
    client: TelegramClient,
    chats: HashMap<i64, mpsc::UnboundedSender<String>>,
}

impl Dispatcher {
    pub fn new(
        archive: ConceptArchive,
        cache: SessionCache,
        ids: Arc<IdGenerator>,
        client: TelegramClient,
    ) -> Self {
        Self {
            archive,
            cache,
            ids,
            client,
            chats: HashMap::new(),
        }
    }

    /// Hand one inbound text to its chat's task, spawning it on first
    /// contact (or again if the old task died).
    pub fn dispatch(&mut self, chat_id: i64, text: String) {
        let sender = self
            .chats
            .entry(chat_id)
            .or_insert_with(|| spawn_chat_task(chat_id, &self.archive, &self.cache, &self.ids, &self.client));

        if let Err(err) = sender.send(text) {
            warn!(chat_id, "chat task gone, respawning");
            let sender = spawn_chat_task(chat_id, &self.archive, &self.cache, &self.ids, &self.client);
            let _ = sender.send(err.0);
            self.chats.insert(chat_id, sender);
        }
    }
}

fn spawn_chat_task(
    chat_id: i64,
    archive: &ConceptArchive,
    cache: &SessionCache,
    ids: &Arc<IdGenerator>,
    client: &TelegramClient,
) -> mpsc::UnboundedSender<String> {
    let (tx, mut rx) = mpsc::unbounded_channel::<String>();
    let archive = archive.clone();
    let cache = cache.clone();
    let ids = ids.clone();
    let client = client.clone();

    tokio::spawn(async move {
        info!(chat_id, "chat session started");
        let mut machine = SessionMachine::connect(chat_id, archive, cache, ids).await;

        while let Some(text) = rx.recv().await {
            for reply in machine.handle(&text).await {
                if let Err(err) = client.send_reply(chat_id, &reply).await {
                    warn!(chat_id, error = %err, "reply delivery failed");
                }
            }
        }

        // Channel closed: drain pending writes before the task ends.
        machine.flush().await;
        info!(chat_id, "chat session ended");
    });

    tx
}
