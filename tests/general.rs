use std::cell::RefCell;
use std::rc::Rc;

use cochan::channel::buffered::fifo;
use cochan::channel::default::default_channel;
use cochan::channel::rendezvous::{broadcast, unicast};
use cochan::select::{self, recv};
use cochan::{RecvError, TryRecvError, TrySendError};
use futures_executor::{block_on, LocalPool};
use futures_util::task::LocalSpawnExt;

#[test]
fn scenario_1_rendezvous_unicast() {
    let mut pool = LocalPool::new();
    let spawner = pool.spawner();
    let ch = unicast::<i32>();
    let order = Rc::new(RefCell::new(Vec::new()));

    let ch_a = ch.clone();
    let order_a = order.clone();
    spawner
        .spawn_local(async move {
            order_a.borrow_mut().push("a-sending");
            ch_a.send(7).await.unwrap();
            order_a.borrow_mut().push("a-resumed");
        })
        .unwrap();
    pool.run_until_stalled();
    assert_eq!(*order.borrow(), vec!["a-sending"]);

    // Both sides have to be driven by the same executor: a plain `block_on`
    // here would wake A's waker, but that waker belongs to `pool`, whose
    // queue only gets serviced by `run_until_stalled`/`run`, never by a
    // thread parked inside an unrelated `block_on`.
    let received = Rc::new(RefCell::new(None));
    let ch_b = ch.clone();
    let order_b = order.clone();
    let received_b = received.clone();
    spawner
        .spawn_local(async move {
            let msg = ch_b.receive().await;
            order_b.borrow_mut().push("b-received");
            *received_b.borrow_mut() = Some(msg);
        })
        .unwrap();
    pool.run_until_stalled();

    assert_eq!(received.borrow_mut().take(), Some(Ok(7)));
    // A attempts its send, finding no receiver yet, before B ever calls
    // receive; which of the two continuations the executor happens to poll
    // to completion first afterward is an executor scheduling detail, not
    // an invariant of the channel itself.
    let order = order.borrow();
    assert_eq!(order[0], "a-sending");
    assert_eq!(order.len(), 3);
    assert!(order.contains(&"a-resumed"));
    assert!(order.contains(&"b-received"));
}

#[test]
fn scenario_2_broadcast_delivery() {
    let mut pool = LocalPool::new();
    let spawner = pool.spawner();
    let ch = broadcast::<&'static str>();
    let got = Rc::new(RefCell::new(Vec::new()));

    for name in ["r1", "r2"] {
        let ch = ch.clone();
        let got = got.clone();
        spawner
            .spawn_local(async move {
                let msg = ch.receive().await.unwrap();
                got.borrow_mut().push((name, msg));
            })
            .unwrap();
    }
    pool.run_until_stalled();

    ch.send_nowait("x").unwrap();
    pool.run_until_stalled();

    assert_eq!(got.borrow().len(), 1);
    assert_eq!(got.borrow()[0].1, "x");
    assert_eq!(ch.receive_nowait(), Err(TryRecvError::NotReady));
}

#[test]
fn scenario_3_buffered_fifo_bound() {
    let mut pool = LocalPool::new();
    let spawner = pool.spawner();
    let ch = fifo::<i32>(Some(2));

    ch.send_nowait(1).unwrap();
    ch.send_nowait(2).unwrap();
    assert_eq!(ch.send_nowait(3), Err(TrySendError::NotReady(3)));

    let sent_third = Rc::new(RefCell::new(false));
    let ch_a = ch.clone();
    let sent_third_a = sent_third.clone();
    spawner
        .spawn_local(async move {
            ch_a.send(3).await.unwrap();
            *sent_third_a.borrow_mut() = true;
        })
        .unwrap();
    pool.run_until_stalled();
    assert!(!*sent_third.borrow());

    assert_eq!(ch.receive_nowait(), Ok(1));
    pool.run_until_stalled();
    assert!(*sent_third.borrow());

    assert_eq!(ch.receive_nowait(), Ok(2));
    assert_eq!(ch.receive_nowait(), Ok(3));
    assert_eq!(ch.receive_nowait(), Err(TryRecvError::NotReady));
}

#[test]
fn scenario_4_close_with_drain() {
    let ch = fifo::<&'static str>(None);
    ch.send_nowait("a").unwrap();
    ch.send_nowait("b").unwrap();
    ch.close();

    assert_eq!(ch.receive_nowait(), Ok("a"));
    assert_eq!(ch.receive_nowait(), Ok("b"));
    assert_eq!(ch.receive_nowait(), Err(TryRecvError::Closed));
}

#[test]
fn scenario_5_close_with_parked_sender() {
    let mut pool = LocalPool::new();
    let spawner = pool.spawner();
    let ch = fifo::<&'static str>(Some(1));
    ch.send_nowait("u").unwrap();

    let result = Rc::new(RefCell::new(None));
    let ch_a = ch.clone();
    let result_a = result.clone();
    spawner
        .spawn_local(async move {
            *result_a.borrow_mut() = Some(ch_a.send("v").await);
        })
        .unwrap();
    pool.run_until_stalled();
    assert!(result.borrow().is_none());

    ch.close();
    pool.run_until_stalled();
    assert!(matches!(
        result.borrow_mut().take(),
        Some(Err(cochan::SendError("v")))
    ));

    assert_eq!(ch.receive_nowait(), Ok("u"));
    assert_eq!(ch.receive_nowait(), Err(TryRecvError::Closed));
}

#[test]
fn scenario_6_select_fairness() {
    let a = fifo::<i32>(None);
    let b = fifo::<i32>(None);
    a.send_nowait(1).unwrap();
    b.send_nowait(2).unwrap();

    let mut wins = [0usize; 2];
    for _ in 0..1000 {
        let ops = vec![recv::<i32, _>(&a), recv::<i32, _>(&b)];
        wins[select::select_nowait(&ops, false).unwrap().index] += 1;
    }
    assert!((450..=550).contains(&wins[0]), "wins[0] = {}", wins[0]);
    assert!((450..=550).contains(&wins[1]), "wins[1] = {}", wins[1]);

    for _ in 0..20 {
        let ops = vec![recv::<i32, _>(&a), recv::<i32, _>(&b)];
        assert_eq!(select::select_nowait(&ops, true).unwrap().index, 0);
    }
}

#[test]
fn scenario_7_select_with_close() {
    block_on(async {
        let a = unicast::<&'static str>();
        let b = unicast::<&'static str>();
        let c = fifo::<&'static str>(None);
        a.close();
        b.close();
        c.send_nowait("q").unwrap();

        let ops = vec![
            recv::<&'static str, _>(&a),
            recv::<&'static str, _>(&b),
            recv::<&'static str, _>(&c),
        ];
        let outcome = select::select(&ops).await.unwrap();
        assert_eq!(outcome.index, 2);
        assert_eq!(c.receive_nowait(), Ok("q"));
    });
}

#[test]
fn scenario_8_default_channel() {
    let mut pool = LocalPool::new();
    let spawner = pool.spawner();
    let ch = default_channel(Some("init"));

    let r1 = ch.clone();
    let r2 = ch.clone();
    assert_eq!(r1.receive_nowait(), Ok("init"));
    assert_eq!(r2.receive_nowait(), Ok("init"));

    ch.send_nowait("next").unwrap();
    assert_eq!(r1.receive_nowait(), Ok("next"));
    assert_eq!(r2.receive_nowait(), Ok("next"));

    ch.reset();
    assert_eq!(ch.receive_nowait(), Err(TryRecvError::NotReady));

    let got = Rc::new(RefCell::new(None));
    let ch_a = ch.clone();
    let got_a = got.clone();
    spawner
        .spawn_local(async move {
            *got_a.borrow_mut() = Some(ch_a.receive().await);
        })
        .unwrap();
    pool.run_until_stalled();
    assert!(got.borrow().is_none());

    ch.send_nowait("again").unwrap();
    pool.run_until_stalled();
    assert_eq!(*got.borrow(), Some(Ok("again")));
}

#[test]
fn close_is_idempotent_and_permanent() {
    let ch = unicast::<i32>();
    assert!(ch.close());
    assert!(!ch.close());
    assert!(ch.is_closed());
    assert_eq!(ch.send_nowait(1), Err(TrySendError::Closed(1)));
}

#[test]
fn iteration_ends_normally_on_close_not_as_an_error() {
    use futures_util::StreamExt;

    block_on(async {
        let ch = fifo::<i32>(None);
        ch.send_nowait(1).unwrap();
        ch.send_nowait(2).unwrap();
        ch.close();

        let mut iter = ch.iter();
        assert_eq!(iter.next().await, Some(1));
        assert_eq!(iter.next().await, Some(2));
        assert_eq!(iter.next().await, None);
    });
}

#[test]
fn recv_error_display_matches_closed_semantics() {
    let err = RecvError;
    assert_eq!(err.to_string(), "receiving from a closed channel");
}
