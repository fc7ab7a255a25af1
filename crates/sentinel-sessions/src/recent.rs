use std::collections::VecDeque;

use dashmap::DashMap;
use sentinel_core::types::{Identity, MessageId, TenantId};
use sentinel_platform::MessageEvent;
use tokio::time::{Duration, Instant};

/// Status posts kept per poster.
pub const STATUS_DEPTH: usize = 10;

struct Kept {
    msg: MessageEvent,
    at: Instant,
}

fn live(entries: &mut VecDeque<Kept>, ttl: Duration, now: Instant) {
    while entries
        .front()
        .is_some_and(|k| now.saturating_duration_since(k.at) >= ttl)
    {
        entries.pop_front();
    }
}

/// Short-lived copies of received messages.
///
/// One-to-one messages are kept per tenant so a deletion can be undone;
/// status posts are kept per poster so they can be read or saved later.
/// Entries are in arrival order, older than `ttl` count as gone, and each
/// queue drops its oldest entry once full.
pub struct RecentMessages {
    direct: DashMap<TenantId, VecDeque<Kept>>,
    statuses: DashMap<(TenantId, Identity), VecDeque<Kept>>,
    ttl: Duration,
    capacity: usize,
}

impl RecentMessages {
    pub fn new(ttl: Duration, capacity: usize) -> Self {
        Self {
            direct: DashMap::new(),
            statuses: DashMap::new(),
            ttl,
            capacity: capacity.max(1),
        }
    }

    pub fn remember(&self, tenant: &TenantId, msg: MessageEvent) {
        let now = Instant::now();
        let mut queue = self.direct.entry(tenant.clone()).or_default();
        live(&mut queue, self.ttl, now);
        if queue.len() >= self.capacity {
            queue.pop_front();
        }
        queue.push_back(Kept { msg, at: now });
    }

    /// Remove and return the live message `id`.
    pub fn take(&self, tenant: &TenantId, id: &MessageId) -> Option<MessageEvent> {
        let now = Instant::now();
        let mut queue = self.direct.get_mut(tenant)?;
        live(&mut queue, self.ttl, now);
        let pos = queue.iter().position(|k| &k.msg.id == id)?;
        queue.remove(pos).map(|k| k.msg)
    }

    pub fn remember_status(&self, tenant: &TenantId, msg: MessageEvent) {
        let now = Instant::now();
        let key = (tenant.clone(), msg.sender.clone());
        let mut queue = self.statuses.entry(key).or_default();
        live(&mut queue, self.ttl, now);
        if queue.len() >= STATUS_DEPTH {
            queue.pop_front();
        }
        queue.push_back(Kept { msg, at: now });
    }

    /// Live status posts of `who`, oldest first.
    pub fn statuses(&self, tenant: &TenantId, who: &Identity) -> Vec<MessageEvent> {
        let now = Instant::now();
        let key = (tenant.clone(), who.clone());
        let Some(mut queue) = self.statuses.get_mut(&key) else {
            return Vec::new();
        };
        live(&mut queue, self.ttl, now);
        queue.iter().map(|k| k.msg.clone()).collect()
    }

    /// Every live status post of `tenant`, grouped by poster in identity order.
    pub fn all_statuses(&self, tenant: &TenantId) -> Vec<(Identity, Vec<MessageEvent>)> {
        let mut posters: Vec<Identity> = self
            .statuses
            .iter()
            .filter(|e| &e.key().0 == tenant)
            .map(|e| e.key().1.clone())
            .collect();
        posters.sort();
        posters
            .into_iter()
            .filter_map(|who| {
                let posts = self.statuses(tenant, &who);
                (!posts.is_empty()).then_some((who, posts))
            })
            .collect()
    }

    /// Drop expired messages and empty queues. Returns messages removed.
    pub fn sweep(&self) -> usize {
        let now = Instant::now();
        let mut removed = 0;
        let mut prune = |queue: &mut VecDeque<Kept>| {
            let before = queue.len();
            live(queue, self.ttl, now);
            removed += before - queue.len();
            !queue.is_empty()
        };
        self.direct.retain(|_, q| prune(q));
        self.statuses.retain(|_, q| prune(q));
        removed
    }

    /// Messages currently held, expired ones included until swept.
    pub fn len(&self) -> usize {
        let direct: usize = self.direct.iter().map(|e| e.value().len()).sum();
        let statuses: usize = self.statuses.iter().map(|e| e.value().len()).sum();
        direct + statuses
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use sentinel_core::types::ChatId;
    use sentinel_platform::MessageContent;

    fn msg(id: &str, sender: &str) -> MessageEvent {
        MessageEvent {
            id: MessageId::from(id),
            chat: ChatId::from("status@broadcast"),
            sender: Identity::from(sender),
            is_group: false,
            from_me: false,
            timestamp: Utc::now(),
            push_name: None,
            content: MessageContent::Text { text: id.to_string() },
            media: None,
        }
    }

    #[test]
    fn take_removes_exactly_one_message() {
        let recent = RecentMessages::new(Duration::from_secs(60), 10);
        let t = TenantId::from("1");
        recent.remember(&t, msg("a", "2"));
        recent.remember(&t, msg("b", "2"));
        assert_eq!(recent.take(&t, &MessageId::from("a")).unwrap().id, MessageId::from("a"));
        assert!(recent.take(&t, &MessageId::from("a")).is_none());
        assert!(recent.take(&TenantId::from("9"), &MessageId::from("b")).is_none());
        assert_eq!(recent.len(), 1);
    }

    #[test]
    fn capacity_drops_the_oldest() {
        let recent = RecentMessages::new(Duration::from_secs(60), 2);
        let t = TenantId::from("1");
        for id in ["a", "b", "c"] {
            recent.remember(&t, msg(id, "2"));
        }
        assert!(recent.take(&t, &MessageId::from("a")).is_none());
        assert!(recent.take(&t, &MessageId::from("c")).is_some());

        for i in 0..STATUS_DEPTH + 3 {
            recent.remember_status(&t, msg(&format!("s{i}"), "3"));
        }
        let kept = recent.statuses(&t, &Identity::from("3"));
        assert_eq!(kept.len(), STATUS_DEPTH);
        assert_eq!(kept[0].id, MessageId::from("s3"));
    }

    #[tokio::test(start_paused = true)]
    async fn expired_messages_are_gone_and_swept() {
        let recent = RecentMessages::new(Duration::from_secs(60), 10);
        let t = TenantId::from("1");
        recent.remember(&t, msg("old", "2"));
        recent.remember_status(&t, msg("post", "3"));
        tokio::time::advance(Duration::from_secs(30)).await;
        recent.remember(&t, msg("new", "2"));
        tokio::time::advance(Duration::from_secs(31)).await;

        assert!(recent.statuses(&t, &Identity::from("3")).is_empty());
        assert_eq!(recent.sweep(), 1, "old direct message; the status went on lookup");
        assert!(recent.take(&t, &MessageId::from("new")).is_some());
        assert!(recent.is_empty());
    }

    #[test]
    fn statuses_are_grouped_per_tenant() {
        let recent = RecentMessages::new(Duration::from_secs(60), 10);
        let (a, b) = (TenantId::from("A"), TenantId::from("B"));
        recent.remember_status(&a, msg("1", "9"));
        recent.remember_status(&a, msg("2", "8"));
        recent.remember_status(&a, msg("3", "9"));
        recent.remember_status(&b, msg("4", "9"));

        let grouped = recent.all_statuses(&a);
        let posters: Vec<&str> = grouped.iter().map(|(who, _)| who.as_str()).collect();
        assert_eq!(posters, vec!["8", "9"]);
        assert_eq!(grouped[1].1.len(), 2);
    }
}
