//! Request arbitration, rule triggering and entry-point validation.

mod common;

use bswm::error::DevError;
use bswm::modes::{
    ComMMode, EthLinkState, LinTpMode, NvmRequestResult, SdClientServiceState, SdEventGroupState,
    SdEventHandlerState, SourceKind, WakeupStatus,
};
use bswm::ports::ServiceId;
use bswm::topology::{Expr, ExprId, PortId, RuleId};
use bswm::{Engine, EngineConfig, PortKey, Topology};

use common::*;

/// Two generic users; `r0` follows user 1, `r1` needs both users at 1.
fn two_users() -> Topology {
    Topology {
        ports: vec![generic("u1", 1), generic("u2", 2)],
        expressions: vec![
            Expr::mode_equals(0, 1),
            Expr::And(vec![Expr::mode_equals(0, 1), Expr::mode_equals(1, 1)]),
        ],
        rules: vec![rule("r0", 0, Some(0), Some(1)), rule("r1", 1, Some(2), None)],
        action_lists: vec![
            list("on", vec![act(0)]),
            list("off", vec![act(1)]),
            list("both", vec![act(2)]),
        ],
        actions: vec![callout(10), callout(11), callout(12)],
        ..Topology::default()
    }
}

#[test]
fn trigger_list_fires_once_per_result_change() {
    let engine = engine(&two_users());
    let rec = Recorder::new();

    engine.request_mode(&rec, 1, 1);
    engine.request_mode(&rec, 1, 1);
    engine.request_mode(&rec, 1, 0);
    engine.request_mode(&rec, 1, 0);
    engine.request_mode(&rec, 1, 1);

    assert_eq!(rec.callouts(), vec![10, 11, 10]);
    assert_eq!(engine.rule_result(RuleId(0)), Some(true));
}

#[test]
fn rule_over_unreported_port_stays_undetermined() {
    let engine = engine(&two_users());
    let rec = Recorder::new();

    for _ in 0..3 {
        engine.request_mode(&rec, 1, 1);
    }

    assert_eq!(engine.rule_result(RuleId(1)), None);
    assert_eq!(engine.expression_result(ExprId(1)), None);
    assert_eq!(engine.port_mode(PortId(1)), None);
    assert!(!rec.callouts().contains(&12));
}

#[test]
fn rule_fires_once_all_ports_are_defined() {
    let engine = engine(&two_users());
    let rec = Recorder::new();

    engine.request_mode(&rec, 1, 1);
    engine.request_mode(&rec, 2, 1);

    assert_eq!(rec.callouts(), vec![10, 12]);
    assert_eq!(engine.expression_result(ExprId(1)), Some(true));
}

#[test]
fn condition_list_fires_on_every_evaluation() {
    let mut t = two_users();
    t.action_lists[0] = condition_list("on", vec![act(0)]);
    let engine = engine(&t);
    let rec = Recorder::new();

    for _ in 0..3 {
        engine.request_mode(&rec, 1, 1);
    }

    assert_eq!(rec.callouts(), vec![10, 10, 10]);
}

#[test]
fn deferred_port_is_evaluated_by_main_function_only() {
    let mut t = two_users();
    t.ports[0] = deferred(generic("u1", 1));
    let engine = engine(&t);
    let rec = Recorder::new();

    engine.request_mode(&rec, 1, 1);
    assert!(rec.callouts().is_empty());
    assert_eq!(engine.port_mode(PortId(0)), Some(1));

    engine.main_function(&rec);
    assert_eq!(rec.callouts(), vec![10]);

    engine.main_function(&rec);
    assert_eq!(rec.callouts(), vec![10]);
    assert_eq!(engine.diagnostics().cycles, 2);
}

#[test]
fn initial_mode_makes_port_defined_after_init() {
    let mut t = two_users();
    let mut p = deferred(generic("u1", 1));
    p.initial_mode = Some(0);
    t.ports[0] = p;
    let engine = engine(&t);
    let rec = Recorder::new();

    assert_eq!(engine.port_mode(PortId(0)), Some(0));
    engine.main_function(&rec);
    assert_eq!(rec.callouts(), vec![11]);
}

#[test]
fn init_forgets_previous_results() {
    let engine = engine(&two_users());
    let rec = Recorder::new();

    engine.request_mode(&rec, 1, 1);
    engine.init();
    assert_eq!(engine.port_mode(PortId(0)), None);
    assert_eq!(engine.rule_result(RuleId(0)), None);

    engine.request_mode(&rec, 1, 1);
    assert_eq!(rec.callouts(), vec![10, 10]);
}

// ---------------------------------------------------------------------------
// Developer errors
// ---------------------------------------------------------------------------

#[test]
fn requests_before_init_report_no_init() {
    let engine = Engine::new(&two_users(), EngineConfig::default()).unwrap();
    let rec = Recorder::new();

    engine.request_mode(&rec, 1, 1);
    engine.comm_current_mode(&rec, 0, ComMMode::FullCommunication);
    engine.main_function(&rec);

    assert_eq!(
        rec.dev_errors(),
        vec![
            (ServiceId::RequestMode, DevError::NoInit),
            (ServiceId::ComMCurrentMode, DevError::NoInit),
        ]
    );
    assert!(rec.callouts().is_empty());
    assert_eq!(engine.diagnostics().cycles, 0);
}

#[test]
fn deinit_turns_requests_into_no_ops() {
    let engine = engine(&two_users());
    let rec = Recorder::new();

    engine.request_mode(&rec, 1, 1);
    engine.deinit();
    engine.request_mode(&rec, 1, 0);

    assert_eq!(rec.dev_errors(), vec![(ServiceId::RequestMode, DevError::NoInit)]);
    assert_eq!(engine.port_mode(PortId(0)), Some(1));
    assert_eq!(rec.callouts(), vec![10]);
}

#[test]
fn unknown_user_is_rejected() {
    let engine = engine(&two_users());
    let rec = Recorder::new();

    engine.request_mode(&rec, 99, 1);

    assert_eq!(
        rec.dev_errors(),
        vec![(ServiceId::RequestMode, DevError::ReqUserOutOfRange)]
    );
}

#[test]
fn generic_max_mode_is_enforced() {
    let mut t = two_users();
    t.ports[0].max_mode = Some(3);
    let engine = engine(&t);
    let rec = Recorder::new();

    engine.request_mode(&rec, 1, 4);
    assert_eq!(
        rec.dev_errors(),
        vec![(ServiceId::RequestMode, DevError::ReqModeOutOfRange)]
    );
    assert_eq!(engine.port_mode(PortId(0)), None);

    engine.request_mode(&rec, 1, 3);
    assert_eq!(engine.port_mode(PortId(0)), Some(3));
}

#[test]
fn source_range_is_checked_on_notify() {
    let t = Topology {
        ports: vec![port("comm0", SourceKind::ComMIndication, 0)],
        ..Topology::default()
    };
    let config = EngineConfig {
        instance_id: 4,
        ..EngineConfig::default()
    };
    let engine = engine_with(&t, config);
    let rec = Recorder::new();

    engine.notify_mode(&rec, PortKey::new(SourceKind::ComMIndication, 0), 5);

    assert_eq!(
        rec.calls(),
        vec![Call::DevError(
            4,
            ServiceId::NotifyMode,
            DevError::ReqModeOutOfRange
        )]
    );
    assert_eq!(engine.port_mode(PortId(0)), None);
}

#[test]
fn detection_off_skips_checks_and_reports() {
    let t = Topology {
        ports: vec![port("comm0", SourceKind::ComMIndication, 0)],
        ..Topology::default()
    };
    let config = EngineConfig {
        dev_error_detect: false,
        ..EngineConfig::default()
    };
    let engine = engine_with(&t, config);
    let rec = Recorder::new();

    engine.notify_mode(&rec, PortKey::new(SourceKind::ComMIndication, 0), 5);
    engine.request_mode(&rec, 42, 1);

    assert!(rec.calls().is_empty());
    assert_eq!(engine.port_mode(PortId(0)), Some(5));
}

// ---------------------------------------------------------------------------
// Typed indications
// ---------------------------------------------------------------------------

#[test]
fn typed_indications_resolve_their_ports() {
    let t = Topology {
        ports: vec![
            port("comm2", SourceKind::ComMIndication, 2),
            port("comm_reset", SourceKind::ComMInitiateReset, 0),
            port("dcm_updated", SourceKind::DcmApplicationUpdated, 0),
            port("j1939", SourceKind::J1939Nm, 0x0305),
            port("wakeup9", SourceKind::EcuMWakeup, 9),
            port("car_wakeup1", SourceKind::NmCarWakeUp, 1),
            port("wdgm4", SourceKind::WdgMPartitionReset, 4),
            port("nvm300", SourceKind::NvMBlock, 300),
            port("lin_sched1", SourceKind::LinSchedule, 1),
        ],
        ..Topology::default()
    };
    let engine = engine(&t);
    let rec = Recorder::new();

    engine.comm_current_mode(&rec, 2, ComMMode::FullCommunication);
    engine.comm_initiate_reset(&rec);
    engine.dcm_application_updated(&rec);
    engine.j1939nm_state_change(&rec, 3, 5, 1);
    engine.ecum_current_wakeup(&rec, 9, WakeupStatus::Validated);
    engine.nmif_car_wakeup_indication(&rec, 1);
    engine.wdgm_request_partition_reset(&rec, 4);
    engine.nvm_current_block_mode(&rec, 300, NvmRequestResult::Pending);
    engine.linsm_current_schedule(&rec, 1, 7);

    assert!(rec.dev_errors().is_empty());
    let modes: Vec<_> = (0..9).map(|p| engine.port_mode(PortId(p))).collect();
    assert_eq!(
        modes,
        vec![
            Some(2),
            Some(1),
            Some(0),
            Some(1),
            Some(2),
            Some(0),
            Some(0),
            Some(2),
            Some(7),
        ]
    );
}

#[test]
fn network_and_discovery_indications_resolve_their_ports() {
    let t = Topology {
        ports: vec![
            port("dcm_req1", SourceKind::DcmComModeRequest, 1),
            port("eth_group2", SourceKind::EthIfPortGroup, 2),
            port("lintp0", SourceKind::LinTp, 0),
            port("sd_client40", SourceKind::SdClientService, 40),
            port("sd_group41", SourceKind::SdConsumedEventGroup, 41),
            port("sd_handler42", SourceKind::SdEventHandler, 42),
            port("j1939_dcm", SourceKind::J1939DcmBroadcast, 0x0006),
        ],
        ..Topology::default()
    };
    let engine = engine(&t);
    let rec = Recorder::new();

    engine.dcm_request_communication_mode(&rec, 1, 0x0B);
    engine.ethif_port_group_link_state_chg(&rec, 2, EthLinkState::Active);
    engine.lintp_request_mode(&rec, 0, LinTpMode::DiagResponse);
    engine.sd_client_service_current_state(&rec, 40, SdClientServiceState::Available);
    engine.sd_consumed_event_group_current_state(&rec, 41, SdEventGroupState::Down);
    engine.sd_event_handler_current_state(&rec, 42, SdEventHandlerState::Requested);
    engine.j1939dcm_broadcast_status(&rec, 0x0006);

    assert!(rec.dev_errors().is_empty());
    let modes: Vec<_> = (0..7).map(|p| engine.port_mode(PortId(p))).collect();
    assert_eq!(
        modes,
        vec![Some(0x0B), Some(1), Some(2), Some(1), Some(0), Some(1), Some(0)]
    );
}

#[test]
fn dcm_communication_mode_request_is_range_checked() {
    let t = Topology {
        ports: vec![port("dcm_req1", SourceKind::DcmComModeRequest, 1)],
        ..Topology::default()
    };
    let engine = engine(&t);
    let rec = Recorder::new();

    engine.dcm_request_communication_mode(&rec, 1, 0x0C);
    engine.j1939dcm_broadcast_status(&rec, 0x0001);

    assert_eq!(
        rec.dev_errors(),
        vec![
            (ServiceId::DcmRequestCommunicationMode, DevError::ReqModeOutOfRange),
            (ServiceId::J1939DcmBroadcastStatus, DevError::ReqUserOutOfRange),
        ]
    );
    assert_eq!(engine.port_mode(PortId(0)), None);
}

#[test]
fn typed_indication_on_unconfigured_channel_is_rejected() {
    let t = Topology {
        ports: vec![port("comm2", SourceKind::ComMIndication, 2)],
        ..Topology::default()
    };
    let engine = engine(&t);
    let rec = Recorder::new();

    engine.comm_current_mode(&rec, 3, ComMMode::NoCommunication);

    assert_eq!(
        rec.dev_errors(),
        vec![(ServiceId::ComMCurrentMode, DevError::ReqUserOutOfRange)]
    );
}
