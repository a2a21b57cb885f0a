// tests/seq.rs

mod common;
use common::*;

use fibre_rendezvous::error::{RecvError, ReduceError};
use fibre_rendezvous::{produce, seq, Channel, Yielder};
use futures_util::stream;
use tokio::sync::oneshot;
use tokio::time::timeout;

fn numbers(upto: u32) -> Channel<u32, String> {
  produce(move |y: Yielder<u32, String>| async move {
    for n in 1..=upto {
      y.put(n).await.map_err(|e| e.to_string())?;
    }
    Ok(())
  })
}

async fn drain(channel: &Channel<u32, String>) -> (Vec<u32>, Result<(), RecvError<String>>) {
  let mut items = Vec::new();
  loop {
    match timeout(SHORT_TIMEOUT, channel.get()).await.expect("pull timed out") {
      Ok(Some(item)) => items.push(item),
      Ok(None) => return (items, Ok(())),
      Err(err) => return (items, Err(err)),
    }
  }
}

#[tokio::test]
async fn map_transforms_every_item() {
  let doubled = seq::map(numbers(3).into_stream(), |n| async move { n * 2 });
  assert_eq!(drain(&doubled).await, (vec![2, 4, 6], Ok(())));
}

#[tokio::test]
async fn map_forwards_upstream_failure() {
  let upstream = produce(|y: Yielder<u32, String>| async move {
    y.put(1).await.map_err(|e| e.to_string())?;
    Err("upstream broke".to_string())
  });
  let mapped = seq::map(upstream.into_stream(), |n| async move { n + 10 });
  assert_eq!(
    drain(&mapped).await,
    (vec![11], Err(RecvError::Aborted("upstream broke".to_string())))
  );
}

#[tokio::test]
async fn map_forwards_upstream_panic() {
  let upstream = produce(|y: Yielder<u32, String>| async move {
    if y.put(1).await.is_err() {
      return Ok(());
    }
    panic!("upstream panicked");
  });
  let mapped = seq::map(upstream.into_stream(), |n| async move { n });
  let (items, outcome) = drain(&mapped).await;
  assert_eq!(items, vec![1]);
  match outcome {
    Err(RecvError::Panicked(message)) => assert!(message.contains("upstream panicked")),
    other => panic!("Expected RecvError::Panicked, got {:?}", other),
  }
}

#[tokio::test]
async fn map_over_plain_stream() {
  let source = stream::iter((1..=ITEMS_LOW as u32).map(Ok::<u32, RecvError<String>>));
  let mapped = seq::map(source, |n| async move { n - 1 });
  let (items, outcome) = drain(&mapped).await;
  assert_eq!(outcome, Ok(()));
  assert_eq!(items, (0..ITEMS_LOW as u32).collect::<Vec<_>>());
}

#[tokio::test]
async fn map_stops_pulling_when_dropped() {
  let (done_tx, done_rx) = oneshot::channel();
  let upstream = produce(move |y: Yielder<u32, String>| async move {
    let mut n = 0;
    while y.put(n).await.is_ok() {
      n += 1;
    }
    let _ = done_tx.send(());
    Ok(())
  });
  let mapped = seq::map(upstream.into_stream(), |n| async move { n });

  assert_eq!(timeout(SHORT_TIMEOUT, mapped.get()).await.unwrap(), Ok(Some(0)));
  drop(mapped);
  timeout(SHORT_TIMEOUT, done_rx)
    .await
    .expect("upstream producer kept running")
    .unwrap();
}

#[tokio::test]
async fn filter_keeps_matching_items() {
  let evens = seq::filter(numbers(6).into_stream(), |n: &u32| {
    let keep = n % 2 == 0;
    async move { keep }
  });
  assert_eq!(drain(&evens).await, (vec![2, 4, 6], Ok(())));
}

#[tokio::test]
async fn filter_yields_each_match_once() {
  let all = seq::filter(numbers(3).into_stream(), |_: &u32| async { true });
  assert_eq!(drain(&all).await, (vec![1, 2, 3], Ok(())));
}

#[tokio::test]
async fn for_each_yield_emits_any_number_of_items() {
  let expanded = seq::for_each_yield(numbers(3).into_stream(), |y: Yielder<u32, String>, n| async move {
    for _ in 0..n {
      y.put(n).await.map_err(|e| e.to_string())?;
    }
    Ok(())
  });
  assert_eq!(drain(&expanded).await, (vec![1, 2, 2, 3, 3, 3], Ok(())));
}

#[tokio::test]
async fn for_each_yield_error_aborts_downstream() {
  let expanded = seq::for_each_yield(numbers(5).into_stream(), |y: Yielder<u32, String>, n| async move {
    if n == 3 {
      return Err(format!("refusing {}", n));
    }
    y.put(n).await.map_err(|e| e.to_string())
  });
  assert_eq!(
    drain(&expanded).await,
    (vec![1, 2], Err(RecvError::Aborted("refusing 3".to_string())))
  );
}

#[tokio::test]
async fn reduce_without_initial_value() {
  let sum = seq::reduce(numbers(5).into_stream(), |acc, n| async move { acc + n }, None).await;
  assert_eq!(sum, Ok(15));
}

#[tokio::test]
async fn reduce_with_initial_value() {
  let sum = seq::reduce(numbers(5).into_stream(), |acc, n| async move { acc + n }, Some(100)).await;
  assert_eq!(sum, Ok(115));

  let single = seq::reduce(numbers(1).into_stream(), |acc, n| async move { acc * n }, None).await;
  assert_eq!(single, Ok(1));
}

#[tokio::test]
async fn reduce_of_empty_sequence() {
  let empty = seq::reduce(numbers(0).into_stream(), |acc, n| async move { acc + n }, None).await;
  assert_eq!(empty, Err(ReduceError::Empty));

  let seeded = seq::reduce(numbers(0).into_stream(), |acc, n| async move { acc + n }, Some(7)).await;
  assert_eq!(seeded, Ok(7));
}

#[tokio::test]
async fn reduce_surfaces_upstream_failure() {
  let upstream = produce(|y: Yielder<u32, String>| async move {
    y.put(1).await.map_err(|e| e.to_string())?;
    Err("halfway".to_string())
  });
  let result = seq::reduce(upstream.into_stream(), |acc, n| async move { acc + n }, None).await;
  assert_eq!(
    result,
    Err(ReduceError::Upstream(RecvError::Aborted("halfway".to_string())))
  );
}
