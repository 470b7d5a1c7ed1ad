// crates/iqrf-dpa/tests/engine_test.rs
//! End-to-end scenarios of the transaction engine against a simulated link.

mod simulator;

use iqrf_dpa::types::{
    BROADCAST_ADDRESS, CMD_COORDINATOR_DISCOVERY, CMD_LED_PULSE, CMD_THERMOMETER_READ,
    COORDINATOR_ADDRESS, HWPID_DO_NOT_CHECK, PNUM_COORDINATOR, PNUM_LEDR, PNUM_THERMOMETER,
};
use iqrf_dpa::{DpaFrame, DpaHandler, ErrorCode, TransactionState};
use simulator::SimulatedChannel;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn led_pulse_request(nadr: u16) -> DpaFrame {
    DpaFrame::request(nadr, PNUM_LEDR, CMD_LED_PULSE, HWPID_DO_NOT_CHECK, &[]).unwrap()
}

fn thermometer_request(nadr: u16) -> DpaFrame {
    DpaFrame::request(
        nadr,
        PNUM_THERMOMETER,
        CMD_THERMOMETER_READ,
        HWPID_DO_NOT_CHECK,
        &[],
    )
    .unwrap()
}

/// Confirmation for the request, carrying the routing triple.
fn confirmation(nadr: u16, pnum: u8, pcmd: u8, hops: u8, timeslot: u8, hops_response: u8) -> Vec<u8> {
    let nadr = nadr.to_le_bytes();
    vec![
        nadr[0],
        nadr[1],
        pnum,
        pcmd | 0x80,
        0xFF,
        0xFF,
        0xFF, // STATUS_CONFIRMATION
        0x30, // DpaValue
        hops,
        timeslot,
        hops_response,
    ]
}

fn response(nadr: u16, pnum: u8, pcmd: u8, status: u8, pdata: &[u8]) -> Vec<u8> {
    let nadr = nadr.to_le_bytes();
    let mut frame = vec![nadr[0], nadr[1], pnum, pcmd | 0x80, 0xFF, 0xFF, status, 0x00];
    frame.extend_from_slice(pdata);
    frame
}

#[test]
fn test_coordinator_request_completes_on_response() {
    init_logging();
    let channel = SimulatedChannel::new();
    let handler = DpaHandler::new(channel.clone());

    channel.enqueue_replies(vec![(
        20,
        response(COORDINATOR_ADDRESS, PNUM_LEDR, CMD_LED_PULSE, 0x00, &[]),
    )]);

    let transaction = handler
        .submit(led_pulse_request(COORDINATOR_ADDRESS), -1, ErrorCode::Ok)
        .unwrap();
    let result = transaction.get();

    assert_eq!(transaction.state(), TransactionState::Processed);
    assert_eq!(result.error_code(), ErrorCode::Ok);
    assert!(!result.is_confirmed());
    assert!(result.is_responded());
    assert_eq!(result.response().unwrap().response_code(), 0x00);
    assert_eq!(channel.sent_frames().len(), 1);
}

#[test]
fn test_unicast_confirmation_then_response() {
    init_logging();
    let channel = SimulatedChannel::new();
    let handler = DpaHandler::new(channel.clone());
    handler.set_timeout(200);

    // Hops=1, TimeSlot=6, HopsResponse=1: the engine must wait
    // (1+1)*6*10 + (1+1)*60 + 40 = 280 ms from the confirmation.
    channel.enqueue_replies(vec![
        (
            10,
            confirmation(0x0001, PNUM_THERMOMETER, CMD_THERMOMETER_READ, 1, 6, 1),
        ),
        (
            120,
            response(
                0x0001,
                PNUM_THERMOMETER,
                CMD_THERMOMETER_READ,
                0x00,
                &[22, 0x69, 0x01],
            ),
        ),
    ]);

    let transaction = handler
        .submit(thermometer_request(0x0001), -1, ErrorCode::Ok)
        .unwrap();
    let result = transaction.get();

    assert_eq!(result.error_code(), ErrorCode::Ok);
    assert!(result.is_confirmed());
    assert!(result.is_responded());
    assert_eq!(transaction.state(), TransactionState::Processed);
}

#[test]
fn test_unicast_times_out_without_response() {
    init_logging();
    let channel = SimulatedChannel::new();
    let handler = DpaHandler::new(channel.clone());
    handler.set_timeout(200);

    channel.enqueue_replies(vec![(
        10,
        confirmation(0x0001, PNUM_THERMOMETER, CMD_THERMOMETER_READ, 1, 6, 1),
    )]);

    let started = Instant::now();
    let transaction = handler
        .submit(thermometer_request(0x0001), -1, ErrorCode::Ok)
        .unwrap();
    let result = transaction.get();
    let elapsed = started.elapsed();

    assert_eq!(result.error_code(), ErrorCode::Timeout);
    assert!(result.is_confirmed());
    assert!(!result.is_responded());
    assert_eq!(transaction.state(), TransactionState::Timeout);
    // 280 ms from the confirmation, not the 200 ms default.
    assert!(elapsed >= Duration::from_millis(280), "elapsed {:?}", elapsed);
}

#[test]
fn test_discovery_waits_beyond_default_timeout() {
    init_logging();
    let channel = SimulatedChannel::new();
    let handler = DpaHandler::new(channel.clone());

    let request = DpaFrame::request(
        COORDINATOR_ADDRESS,
        PNUM_COORDINATOR,
        CMD_COORDINATOR_DISCOVERY,
        HWPID_DO_NOT_CHECK,
        &[0x07, 0x00],
    )
    .unwrap();

    // Far past the 500 ms default; only the infinite whitelist survives this.
    channel.enqueue_replies(vec![(
        1_500,
        response(
            COORDINATOR_ADDRESS,
            PNUM_COORDINATOR,
            CMD_COORDINATOR_DISCOVERY,
            0x00,
            &[0x01],
        ),
    )]);

    let started = Instant::now();
    let transaction = handler.submit(request, -1, ErrorCode::Ok).unwrap();
    let result = transaction.get();
    let elapsed = started.elapsed();

    assert_eq!(result.error_code(), ErrorCode::Ok);
    assert!(result.is_responded());
    assert!(elapsed >= Duration::from_millis(1_400), "elapsed {:?}", elapsed);
}

#[test]
fn test_queue_saturation_reports_queue_full() {
    init_logging();
    let channel = SimulatedChannel::new();
    let handler = DpaHandler::new(channel.clone());
    handler.set_timeout(200);

    // The worker parks inside send long enough for the queue to fill.
    channel.set_send_delay(400);
    let blocker = handler
        .submit(thermometer_request(0x0001), -1, ErrorCode::Ok)
        .unwrap();
    thread::sleep(Duration::from_millis(100));

    let mut queued = Vec::new();
    for node in 0..16u16 {
        queued.push(
            handler
                .submit(thermometer_request(node + 2), -1, ErrorCode::Ok)
                .unwrap(),
        );
    }

    let overflow = handler
        .submit(thermometer_request(0x00EE), -1, ErrorCode::Ok)
        .unwrap();
    let started = Instant::now();
    let result = overflow.get();
    assert_eq!(result.error_code(), ErrorCode::IfaceQueueFull);
    // Rejected at submission; get() must not wait for the queue to drain.
    assert!(started.elapsed() < Duration::from_millis(100));

    drop(queued);
    drop(blocker);
}

#[test]
fn test_async_notification_reaches_handler_once() {
    init_logging();
    let channel = SimulatedChannel::new();
    let handler = DpaHandler::new(channel.clone());

    let invocations = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&invocations);
    handler.register_async_handler("test-service", Box::new(move |_| {
        seen.fetch_add(1, Ordering::SeqCst);
    }));

    // A response flagged STATUS_ASYNC_RESPONSE while nothing is in flight.
    channel.inject(0, response(0x0001, 0x02, 0x01, 0x80, &[]));
    thread::sleep(Duration::from_millis(100));
    assert_eq!(invocations.load(Ordering::SeqCst), 1);

    // An unsolicited request from the mesh takes the same path.
    channel.inject(
        0,
        DpaFrame::request(0x0001, 0x20, 0x01, 0x0000, &[0xAB])
            .unwrap()
            .as_bytes()
            .to_vec(),
    );
    thread::sleep(Duration::from_millis(100));
    assert_eq!(invocations.load(Ordering::SeqCst), 2);

    handler.unregister_async_handler("test-service");
    channel.inject(0, response(0x0001, 0x02, 0x01, 0x80, &[]));
    thread::sleep(Duration::from_millis(100));
    assert_eq!(invocations.load(Ordering::SeqCst), 2);
}

#[test]
fn test_broadcast_completes_after_confirmation_window() {
    init_logging();
    let channel = SimulatedChannel::new();
    let handler = DpaHandler::new(channel.clone());
    handler.set_timeout(200);

    channel.enqueue_replies(vec![(
        10,
        confirmation(BROADCAST_ADDRESS, PNUM_LEDR, CMD_LED_PULSE, 1, 6, 0),
    )]);

    let transaction = handler
        .submit(led_pulse_request(BROADCAST_ADDRESS), -1, ErrorCode::Ok)
        .unwrap();
    let result = transaction.get();

    assert_eq!(result.error_code(), ErrorCode::Ok);
    assert!(result.is_confirmed());
    assert!(!result.is_responded());
    assert_eq!(transaction.state(), TransactionState::Processed);
}

#[test]
fn test_mismatched_frames_do_not_disturb_transaction() {
    init_logging();
    let channel = SimulatedChannel::new();
    let handler = DpaHandler::new(channel.clone());
    handler.set_timeout(200);

    channel.enqueue_replies(vec![
        // Response from a different node; must be logged and dropped.
        (
            20,
            response(0x0002, PNUM_THERMOMETER, CMD_THERMOMETER_READ, 0x00, &[]),
        ),
        (
            60,
            response(
                0x0001,
                PNUM_THERMOMETER,
                CMD_THERMOMETER_READ,
                0x00,
                &[22, 0x69, 0x01],
            ),
        ),
    ]);

    let transaction = handler
        .submit(thermometer_request(0x0001), -1, ErrorCode::Ok)
        .unwrap();
    let result = transaction.get();

    assert_eq!(result.error_code(), ErrorCode::Ok);
    assert_eq!(result.response().unwrap().nadr(), 0x0001);
}

#[test]
fn test_send_failure_reports_interface_error() {
    init_logging();
    let channel = SimulatedChannel::new();
    let handler = DpaHandler::new(channel.clone());

    channel.fail_sends(true);
    let transaction = handler
        .submit(thermometer_request(0x0001), -1, ErrorCode::Ok)
        .unwrap();
    let result = transaction.get();

    assert_eq!(result.error_code(), ErrorCode::Iface);
    assert_eq!(transaction.state(), TransactionState::InterfaceError);
}

#[test]
fn test_default_error_finishes_without_sending() {
    init_logging();
    let channel = SimulatedChannel::new();
    let handler = DpaHandler::new(channel.clone());

    let transaction = handler
        .submit(thermometer_request(0x0001), -1, ErrorCode::Nadr)
        .unwrap();
    let result = transaction.get();

    assert_eq!(result.error_code(), ErrorCode::Nadr);
    assert!(channel.sent_frames().is_empty());
}

#[test]
fn test_empty_request_rejected_up_front() {
    init_logging();
    let channel = SimulatedChannel::new();
    let handler = DpaHandler::new(channel.clone());

    let short = DpaFrame::from_bytes(&[0x01, 0x00]).unwrap();
    assert!(handler.submit(short, -1, ErrorCode::Ok).is_err());
}

#[test]
fn test_transaction_never_started_is_iface_busy() {
    init_logging();
    let channel = SimulatedChannel::new();
    let handler = DpaHandler::new(channel.clone());
    handler.set_timeout(200);

    // First transaction parks the worker in send well past the second
    // transaction's 200 ms start window.
    channel.set_send_delay(600);
    let blocker = handler
        .submit(thermometer_request(0x0001), -1, ErrorCode::Ok)
        .unwrap();
    thread::sleep(Duration::from_millis(50));

    let starved = handler
        .submit(thermometer_request(0x0002), -1, ErrorCode::Ok)
        .unwrap();
    let result = starved.get();
    assert_eq!(result.error_code(), ErrorCode::IfaceBusy);

    drop(blocker);
}

#[test]
fn test_abort_unblocks_get() {
    init_logging();
    let channel = SimulatedChannel::new();
    let handler = DpaHandler::new(channel.clone());

    // No reply scripted; the transaction would run into its timeout.
    let transaction = handler
        .submit(thermometer_request(0x0001), 5_000, ErrorCode::Ok)
        .unwrap();
    thread::sleep(Duration::from_millis(50));

    let started = Instant::now();
    transaction.abort();
    let result = transaction.get();

    assert_eq!(result.error_code(), ErrorCode::Aborted);
    assert_eq!(transaction.state(), TransactionState::Aborted);
    assert!(started.elapsed() < Duration::from_millis(1_000));
}

#[test]
fn test_override_error_before_get() {
    init_logging();
    let channel = SimulatedChannel::new();
    let handler = DpaHandler::new(channel.clone());

    channel.enqueue_replies(vec![(
        10,
        response(COORDINATOR_ADDRESS, PNUM_LEDR, CMD_LED_PULSE, 0x00, &[]),
    )]);
    let transaction = handler
        .submit(led_pulse_request(COORDINATOR_ADDRESS), -1, ErrorCode::Ok)
        .unwrap();
    thread::sleep(Duration::from_millis(150));

    transaction.override_error(ErrorCode::User(0x21));
    let result = transaction.get();
    assert_eq!(result.error_code(), ErrorCode::User(0x21));
}

#[test]
fn test_shutdown_aborts_backlog() {
    init_logging();
    let channel = SimulatedChannel::new();
    let handler = DpaHandler::new(channel.clone());
    handler.set_timeout(200);

    channel.set_send_delay(300);
    let blocker = handler
        .submit(thermometer_request(0x0001), -1, ErrorCode::Ok)
        .unwrap();
    thread::sleep(Duration::from_millis(50));
    let queued = handler
        .submit(thermometer_request(0x0002), -1, ErrorCode::Ok)
        .unwrap();

    drop(handler);

    assert_eq!(blocker.get().error_code(), ErrorCode::Aborted);
    assert_eq!(queued.get().error_code(), ErrorCode::Aborted);
}

#[test]
fn test_submissions_execute_in_order() {
    init_logging();
    let channel = SimulatedChannel::new();
    let handler = DpaHandler::new(channel.clone());
    handler.set_timeout(200);

    for node in 1..=3u16 {
        channel.enqueue_replies(vec![(
            10,
            response(node, PNUM_THERMOMETER, CMD_THERMOMETER_READ, 0x00, &[0, 0, 0]),
        )]);
    }

    let transactions: Vec<_> = (1..=3u16)
        .map(|node| {
            handler
                .submit(thermometer_request(node), -1, ErrorCode::Ok)
                .unwrap()
        })
        .collect();
    for transaction in &transactions {
        let result = transaction.get();
        assert_eq!(result.error_code(), ErrorCode::Ok);
    }

    let sent = channel.sent_frames();
    assert_eq!(sent.len(), 3);
    for (index, frame) in sent.iter().enumerate() {
        assert_eq!(frame[0], (index + 1) as u8);
    }
}
