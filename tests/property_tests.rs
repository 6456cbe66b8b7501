//! Property-based tests for the invariants listed in this crate's testable
//! properties: LST ordering/conservation/back-index consistency, and channel
//! sequencing/accounting.

use std::cmp::Ordering;

use proptest::prelude::*;

use ringkit_rs::config::DEFAULT_CONFIG;
use ringkit_rs::{Channel, ChannelId, Indexed, Lst, RequestEnvelope, RingControlPlane, REMOVED};

#[derive(Debug, Clone, Copy)]
struct Item(i32, i32);

impl Indexed for Item {
    fn back_index(&self) -> i32 {
        self.1
    }
    fn set_back_index(&mut self, index: i32) {
        self.1 = index;
    }
}

fn natural_order(a: &Item, b: &Item) -> Ordering {
    a.0.cmp(&b.0)
}

// =============================================================================
// INV-1: LST ordering
// "popping repeatedly yields a non-decreasing sequence under the comparator"
// =============================================================================

proptest! {
    #[test]
    fn prop_lst_ordering(values in prop::collection::vec(any::<i16>(), 0..200), seed: u64) {
        let mut t: Lst<Item, _> = Lst::with_seed(256, 16, natural_order, seed);
        for v in &values {
            t.insert(Item(*v as i32, REMOVED)).unwrap();
        }
        let mut prev = None;
        while let Some(item) = t.pop() {
            if let Some(p) = prev {
                prop_assert!(item.0 >= p, "INV-1 violated: {} popped after {}", item.0, p);
            }
            prev = Some(item.0);
        }
    }
}

// =============================================================================
// INV-2: LST conservation
// "num_elements equals inserts minus successful extracts"
// =============================================================================

proptest! {
    #[test]
    fn prop_lst_conservation(values in prop::collection::vec(any::<i16>(), 0..200), seed: u64) {
        let mut t: Lst<Item, _> = Lst::with_seed(256, 16, natural_order, seed);
        let mut inserts = 0usize;
        for v in &values {
            t.insert(Item(*v as i32, REMOVED)).unwrap();
            inserts += 1;
        }
        prop_assert_eq!(t.len(), inserts, "INV-2 violated after inserts");

        let mut extracts = 0usize;
        while let Some(item) = t.peek().copied() {
            if item.0 % 2 == 0 {
                t.extract(item.back_index()).unwrap();
                extracts += 1;
            } else {
                t.pop();
                extracts += 1;
            }
        }
        prop_assert_eq!(t.len(), inserts - extracts, "INV-2 violated after drain");
        prop_assert_eq!(t.len(), 0);
    }
}

// =============================================================================
// INV-4: LST back-index
// "for every live element e, the container's slot at e's back-index holds e"
// =============================================================================

proptest! {
    #[test]
    fn prop_lst_back_index_consistency(values in prop::collection::vec(any::<i16>(), 1..150), seed: u64) {
        use std::cell::Cell;
        use std::rc::Rc;

        #[derive(Debug)]
        struct RcItem(i32, Cell<i32>);

        impl Indexed for Rc<RcItem> {
            fn back_index(&self) -> i32 {
                self.1.get()
            }
            fn set_back_index(&mut self, index: i32) {
                self.1.set(index);
            }
        }

        fn rc_order(a: &Rc<RcItem>, b: &Rc<RcItem>) -> Ordering {
            a.0.cmp(&b.0)
        }

        let mut t: Lst<Rc<RcItem>, _> = Lst::with_seed(256, 16, rc_order, seed);
        let mut live = Vec::new();
        for v in &values {
            let h = Rc::new(RcItem(*v as i32, Cell::new(REMOVED)));
            t.insert(h.clone()).unwrap();
            live.push(h);
        }

        // Every handle with a non-removed back-index must still be
        // extractable at exactly that index, and extracting it must yield
        // the same value back.
        for h in &live {
            let bi = h.back_index();
            if bi != REMOVED {
                let v = h.0;
                let removed = t.extract(bi).unwrap();
                prop_assert_eq!(removed.0, v, "INV-4 violated: wrong element at back-index {}", bi);
            }
        }
    }
}

// =============================================================================
// INV-6 / INV-7: Channel sequencing and accounting
// "receiver observes sequence numbers 1, 2, 3, ... without gaps; num_outstanding
// returns to 0 after a balanced run"
// =============================================================================

proptest! {
    #[test]
    fn prop_channel_sequencing_and_accounting(n in 0usize..200) {
        let (ch, requestor, responder) = Channel::<u64, u64>::create(
            ChannelId(1),
            RingControlPlane::new(1024),
            RingControlPlane::new(1024),
            false,
            DEFAULT_CONFIG,
        );

        let mut expected = 1u64;
        responder.set_recv_request(move |req: RequestEnvelope<u64>| {
            assert_eq!(req.descriptor.sequence, expected);
            expected += 1;
        });

        for i in 0..n as u64 {
            requestor.send_request(std::time::Instant::now(), i).unwrap();
            assert!(responder.recv_request());
            responder
                .send_reply(std::time::Instant::now(), i, std::time::Duration::ZERO, std::time::Duration::ZERO)
                .unwrap();
            assert!(requestor.recv_reply());
        }

        let metrics = ch.metrics();
        prop_assert_eq!(metrics.requestor_outstanding, 0, "INV-7 violated: requestor side");
        prop_assert_eq!(metrics.responder_outstanding, 0, "INV-7 violated: responder side");
        prop_assert_eq!(metrics.requestor_sequence, n as u64);
        prop_assert_eq!(metrics.responder_sequence, n as u64);
    }
}

// =============================================================================
// INV-8: Close handshake
// "once either side signals close, active() returns false"
// =============================================================================

proptest! {
    #[test]
    fn prop_close_handshake_deactivates(n in 0usize..20) {
        let (ch, requestor, responder) = Channel::<u64, u64>::create(
            ChannelId(2),
            RingControlPlane::new(64),
            RingControlPlane::new(64),
            false,
            DEFAULT_CONFIG,
        );

        for i in 0..n as u64 {
            requestor.send_request(std::time::Instant::now(), i).unwrap();
            assert!(responder.recv_request());
            responder
                .send_reply(std::time::Instant::now(), i, std::time::Duration::ZERO, std::time::Duration::ZERO)
                .unwrap();
        }

        ch.signal_responder_close().unwrap();
        prop_assert!(!ch.active());
        prop_assert!(responder
            .send_reply(std::time::Instant::now(), 0, std::time::Duration::ZERO, std::time::Duration::ZERO)
            .is_err());
    }
}
