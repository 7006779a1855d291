//! Frame-exchange tests across node, gateway and server.

use lorasim_rs::{
    FCtrl, Gateway, MacCommand, NetworkServer, Node, SpreadingFactor,
};

fn make_node(id: usize) -> Node {
    Node::new(id, 0.0, 0.0, SpreadingFactor::SF7, 14.0, 0)
}

#[test]
fn test_confirmed_uplink_sets_ack_state() {
    let mut node = make_node(1);
    let frame = node.prepare_uplink(b"ping", true);
    assert!(frame.confirmed);
    assert_eq!(node.fcnt_up, 1);
    assert!(node.awaiting_ack);
}

#[test]
fn test_link_adr_round_trip() {
    let mut node = make_node(1);
    let mut gateways = vec![Gateway::new(0, 0.0, 0.0)];
    let mut server = NetworkServer::new(false);

    node.prepare_uplink(b"ping", true);
    server.send_downlink(
        &mut node,
        &mut gateways,
        b"",
        true,
        Some((SpreadingFactor::SF9, 5.0)),
        true,
    );
    assert_eq!(node.downlink_pending, 1);

    let frame = gateways[0].pop_downlink(node.id).expect("downlink queued");
    assert!(frame.fctrl.contains(FCtrl::ACK));
    node.handle_downlink(&frame);

    assert_eq!(node.sf, SpreadingFactor::SF9);
    assert_eq!(node.tx_power_dbm, 5.0);
    assert!(!node.awaiting_ack);
    assert!(node.need_downlink_ack);
    assert_eq!(node.downlink_pending, 0);
    assert_eq!(
        node.pending_mac_answer,
        Some(MacCommand::LinkAdrAns { status: 0x07 })
    );

    // the answer rides at the head of the next uplink
    let uplink = node.prepare_uplink(b"data", false);
    assert!(uplink.fctrl.contains(FCtrl::ACK));
    assert!(uplink
        .payload
        .starts_with(&MacCommand::LinkAdrAns { status: 0x07 }.encode()));
    assert!(node.pending_mac_answer.is_none());
    assert!(!node.need_downlink_ack);
}

#[test]
fn test_link_check_and_device_time_requests() {
    let mut node = make_node(2);
    let mut gateways = vec![Gateway::new(0, 0.0, 0.0)];
    let mut server = NetworkServer::new(false);

    node.prepare_uplink(b"foo", true);
    assert!(node.awaiting_ack);

    server.send_downlink(
        &mut node,
        &mut gateways,
        &MacCommand::LinkCheckReq.encode(),
        true,
        None,
        true,
    );
    let frame = gateways[0].pop_downlink(node.id).unwrap();
    node.handle_downlink(&frame);
    assert!(!node.awaiting_ack);
    assert!(node.need_downlink_ack);
    assert_eq!(
        node.pending_mac_answer,
        Some(MacCommand::LinkCheckAns {
            margin: 255,
            gw_cnt: 1
        })
    );

    let uplink = node.prepare_uplink(b"hello", false);
    assert!(uplink.fctrl.contains(FCtrl::ACK));
    assert!(uplink.payload.starts_with(&[0x02, 255, 1]));
    assert!(!node.need_downlink_ack);

    server.send_downlink(
        &mut node,
        &mut gateways,
        &MacCommand::DeviceTimeReq.encode(),
        false,
        None,
        false,
    );
    let frame = gateways[0].pop_downlink(node.id).unwrap();
    node.handle_downlink(&frame);
    assert!(matches!(
        node.pending_mac_answer,
        Some(MacCommand::DeviceTimeAns { .. })
    ));
}

#[test]
fn test_downlink_fcnt_synchronization() {
    let mut node = make_node(3);
    let mut gateways = vec![Gateway::new(0, 0.0, 0.0)];
    let mut server = NetworkServer::new(false);

    for _ in 0..3 {
        server.send_downlink(&mut node, &mut gateways, b"x", false, None, false);
    }
    assert_eq!(node.downlink_pending, 3);
    for expected in 0..3u32 {
        let frame = gateways[0].pop_downlink(node.id).unwrap();
        assert_eq!(frame.fcnt as u32, expected);
        node.handle_downlink(&frame);
        assert_eq!(node.fcnt_down, expected + 1);
    }
    assert_eq!(node.downlink_pending, 0);
}

#[test]
fn test_unknown_mac_command_is_ignored() {
    let mut node = make_node(4);
    let mut gateways = vec![Gateway::new(0, 0.0, 0.0)];
    let mut server = NetworkServer::new(false);

    server.send_downlink(&mut node, &mut gateways, &[0x7F, 1, 2, 3], false, None, false);
    let frame = gateways[0].pop_downlink(node.id).unwrap();
    let sf_before = node.sf;
    node.handle_downlink(&frame);
    assert_eq!(node.sf, sf_before);
    assert!(node.pending_mac_answer.is_none());
}
