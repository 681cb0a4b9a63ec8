use std::time::Duration;

use fapi_pipeline::{Admission, PipelineError, Rejection, WriteJob, write_queue};
use tokio_util::sync::CancellationToken;

fn job(n: usize) -> WriteJob {
    WriteJob::new(format!("{{\"n\":{n}}}").into_bytes(), format!("/tmp/job-{n}.json"))
}

#[tokio::test]
async fn admissions_within_capacity_never_wait() {
    let (queue, _receiver) = write_queue(8).unwrap();
    let never = CancellationToken::new();

    for n in 0..8 {
        let outcome = tokio::time::timeout(Duration::from_millis(100), queue.admit(job(n), &never))
            .await
            .expect("admission within capacity must not block");
        assert_eq!(outcome, Admission::Admitted);
    }
    assert_eq!(queue.depth(), 8);
    assert_eq!(queue.capacity(), 8);
}

#[tokio::test]
async fn concurrent_producers_within_capacity_are_all_admitted() {
    let (queue, mut receiver) = write_queue(16).unwrap();

    let producers: Vec<_> = (0..16)
        .map(|n| {
            let queue = queue.clone();
            tokio::spawn(async move {
                let never = CancellationToken::new();
                tokio::time::timeout(Duration::from_millis(200), queue.admit(job(n), &never)).await
            })
        })
        .collect();

    for p in producers {
        assert_eq!(p.await.unwrap().unwrap(), Admission::Admitted);
    }

    let mut drained = 0;
    while receiver.try_recv().is_some() {
        drained += 1;
    }
    assert_eq!(drained, 16);
}

#[tokio::test]
async fn overflow_producer_is_rejected_when_its_signal_fires_first() {
    const CAPACITY: usize = 4;
    let (queue, mut receiver) = write_queue(CAPACITY).unwrap();
    let never = CancellationToken::new();

    let mut admitted = 0;
    for n in 0..CAPACITY {
        if queue.admit(job(n), &never).await == Admission::Admitted {
            admitted += 1;
        }
    }

    let deadline = CancellationToken::new();
    let trigger = deadline.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        trigger.cancel();
    });

    let outcome = queue.admit(job(CAPACITY), &deadline).await;
    assert_eq!(outcome, Admission::Rejected(Rejection::Cancelled));
    assert_eq!(admitted, CAPACITY);

    let mut drained = Vec::new();
    while let Some(job) = receiver.try_recv() {
        drained.push(job);
    }
    assert_eq!(drained.len(), CAPACITY);
    assert!(drained.iter().all(|j| !j.destination().ends_with("job-4.json")));
}

#[tokio::test]
async fn blocked_producer_is_admitted_once_a_slot_frees() {
    let (queue, mut receiver) = write_queue(1).unwrap();
    let never = CancellationToken::new();
    assert_eq!(queue.admit(job(0), &never).await, Admission::Admitted);

    let waiting = {
        let queue = queue.clone();
        tokio::spawn(async move {
            let never = CancellationToken::new();
            queue.admit(job(1), &never).await
        })
    };

    tokio::time::sleep(Duration::from_millis(30)).await;
    assert!(!waiting.is_finished(), "producer should wait while the queue is full");

    let first = receiver.recv().await.unwrap();
    assert!(first.destination().ends_with("job-0.json"));
    assert_eq!(waiting.await.unwrap(), Admission::Admitted);

    let second = receiver.recv().await.unwrap();
    assert!(second.destination().ends_with("job-1.json"));
}

#[tokio::test]
async fn jobs_leave_in_admission_order() {
    let (queue, mut receiver) = write_queue(4).unwrap();
    let never = CancellationToken::new();
    for n in 0..4 {
        queue.admit(job(n), &never).await;
    }
    for n in 0..4 {
        let j = receiver.recv().await.unwrap();
        assert_eq!(j.payload(), format!("{{\"n\":{n}}}").as_bytes());
    }
}

#[tokio::test]
async fn free_slot_wins_over_an_already_fired_signal() {
    let (queue, _receiver) = write_queue(1).unwrap();
    let fired = CancellationToken::new();
    fired.cancel();
    assert_eq!(queue.admit(job(0), &fired).await, Admission::Admitted);
}

#[tokio::test]
async fn closed_queue_rejects() {
    let (queue, receiver) = write_queue(1).unwrap();
    drop(receiver);
    let never = CancellationToken::new();
    assert!(queue.is_closed());
    assert_eq!(
        queue.admit(job(0), &never).await,
        Admission::Rejected(Rejection::Closed)
    );
}

#[test]
fn zero_capacity_is_a_config_error() {
    assert!(matches!(
        write_queue(0),
        Err(PipelineError::InvalidConfig { field: "queue_capacity", .. })
    ));
}
