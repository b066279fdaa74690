//! Tickets for host-resolved asynchronous work.
//!
//! The editor core is single-threaded and synchronous; anything that takes
//! time (uploads, link creation, link search) is handed to the host as a
//! ticket and resolved later by a discrete call back into the editor. Stale
//! resolutions are detected against document revisions or sequence numbers
//! and dropped.

use vellum_model::Selection;

/// Handle for an in-flight upload; the placeholder node carries the id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadTicket {
    pub id: u64,
}

/// Handle for a pending link creation, pinned to a document revision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkTicket {
    pub id: u64,
}

/// Sequence number of a link search request; only the latest is live.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct SearchSeq(pub u64);

/// A link search hit returned by the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkSearchResult {
    pub title: String,
    pub url: String,
}

/// A link creation recorded against the selection and revision at request
/// time. Resolution against a changed revision is dropped.
#[derive(Debug, Clone)]
pub(crate) struct PendingLink {
    pub ticket: LinkTicket,
    pub selection: Selection,
    pub revision: u64,
}

/// Counters and pending records for host-resolved work.
#[derive(Debug, Default)]
pub(crate) struct HostTasks {
    next_upload_id: u64,
    next_link_id: u64,
    next_search_seq: u64,
    pub pending_links: Vec<PendingLink>,
    /// The only search sequence whose results will be accepted.
    pub latest_search: Option<SearchSeq>,
}

impl HostTasks {
    pub fn next_upload(&mut self) -> UploadTicket {
        self.next_upload_id += 1;
        UploadTicket {
            id: self.next_upload_id,
        }
    }

    pub fn record_link(&mut self, selection: Selection, revision: u64) -> LinkTicket {
        self.next_link_id += 1;
        let ticket = LinkTicket {
            id: self.next_link_id,
        };
        self.pending_links.push(PendingLink {
            ticket,
            selection,
            revision,
        });
        ticket
    }

    pub fn take_link(&mut self, ticket: LinkTicket) -> Option<PendingLink> {
        let i = self.pending_links.iter().position(|p| p.ticket == ticket)?;
        Some(self.pending_links.remove(i))
    }

    pub fn next_search(&mut self) -> SearchSeq {
        self.next_search_seq += 1;
        let seq = SearchSeq(self.next_search_seq);
        self.latest_search = Some(seq);
        seq
    }

    pub fn is_latest_search(&self, seq: SearchSeq) -> bool {
        self.latest_search == Some(seq)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_last_request_wins() {
        let mut tasks = HostTasks::default();
        let first = tasks.next_search();
        let second = tasks.next_search();
        assert!(!tasks.is_latest_search(first));
        assert!(tasks.is_latest_search(second));
    }

    #[test]
    fn test_link_tickets_are_single_use() {
        let mut tasks = HostTasks::default();
        let ticket = tasks.record_link(Selection::caret(1), 4);
        assert!(tasks.take_link(ticket).is_some());
        assert!(tasks.take_link(ticket).is_none());
    }
}
