//! End-to-end runs of the session driver against loopback servers.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::RecordingPresenter;
use gavel_config::FavoriteServerEntry;
use gavel_net::{LinkConfig, MasterConfig, ServerDescriptor, SrvEndpoint, StaticResolver};
use gavel_session::{
    ClientCommand, ClientVersion, MachineConfig, PresenterEvent, ProtocolStateMachine,
    ServerSelection, ServerTab, SessionDriver, SessionPhase,
};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;

const WAIT: Duration = Duration::from_secs(5);

/// Read one `%`-terminated packet, terminator included.
async fn read_packet(stream: &mut TcpStream) -> String {
    let mut out = Vec::new();
    let mut byte = [0u8; 1];
    loop {
        let n = stream.read(&mut byte).await.unwrap();
        assert!(n > 0, "client closed mid-packet: {:?}", String::from_utf8_lossy(&out));
        out.push(byte[0]);
        if byte[0] == b'%' {
            return String::from_utf8(out).unwrap();
        }
    }
}

/// Block until the client closes its side.
async fn drain(stream: &mut TcpStream) {
    let mut buf = [0u8; 256];
    while let Ok(n) = stream.read(&mut buf).await {
        if n == 0 {
            break;
        }
    }
}

fn build_driver(
    master_port: u16,
    presenter: RecordingPresenter,
) -> (
    mpsc::Sender<ClientCommand>,
    SessionDriver<RecordingPresenter>,
) {
    let mut machine = ProtocolStateMachine::new(MachineConfig::default(), presenter);
    machine.construct_lobby();

    let resolver = Arc::new(StaticResolver::new(vec![SrvEndpoint::new(
        "127.0.0.1",
        master_port,
    )]));
    let master_config = MasterConfig {
        srv_name: "_test._tcp.localhost".to_string(),
        link: LinkConfig {
            connect_timeout: Duration::from_millis(500),
            ..LinkConfig::default()
        },
    };

    let (commands_tx, commands_rx) = mpsc::channel(16);
    let driver = SessionDriver::new(
        machine,
        master_config,
        LinkConfig::default(),
        resolver,
        commands_rx,
    );
    (commands_tx, driver)
}

fn start_driver(
    master_port: u16,
    presenter: RecordingPresenter,
) -> (
    mpsc::Sender<ClientCommand>,
    tokio::task::JoinHandle<ProtocolStateMachine<RecordingPresenter>>,
) {
    let (commands, driver) = build_driver(master_port, presenter);
    (commands, tokio::spawn(driver.run()))
}

/// A port with nothing listening on it.
async fn refused_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap().port()
}

fn loopback(port: u16) -> ServerDescriptor {
    ServerDescriptor {
        name: "Loopback".to_string(),
        description: String::new(),
        address: "127.0.0.1".to_string(),
        port,
    }
}

#[tokio::test]
async fn test_full_session_through_master_directory() {
    let master_listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let master_port = master_listener.local_addr().unwrap().port();
    let game_listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let game_port = game_listener.local_addr().unwrap().port();

    let master = tokio::spawn(async move {
        let (mut stream, _) = master_listener.accept().await.unwrap();
        assert_eq!(read_packet(&mut stream).await, "ALL#%");
        let listing = format!("ALL#Loopback&Test server&127.0.0.1&{game_port}#%");
        stream.write_all(listing.as_bytes()).await.unwrap();
        drain(&mut stream).await;
    });

    let game = tokio::spawn(async move {
        let (mut stream, _) = game_listener.accept().await.unwrap();
        stream.write_all(b"decryptor#NOENCRYPT#%").await.unwrap();
        assert!(read_packet(&mut stream).await.starts_with("HI#"));

        stream.write_all(b"ID#1#loopback#%").await.unwrap();
        let identify = format!("ID#AO2#{}#%", ClientVersion::CURRENT);
        assert_eq!(read_packet(&mut stream).await, identify);

        // Two packets split across writes.
        stream.write_all(b"FL#fastloading#noencryption#%SI#1#0").await.unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        stream.write_all(b"#1#%").await.unwrap();
        assert_eq!(read_packet(&mut stream).await, "RC#%");

        stream.write_all(b"SC#Phoenix&Defense#%").await.unwrap();
        assert_eq!(read_packet(&mut stream).await, "RM#%");

        stream.write_all(b"SM#Trial.opus#%").await.unwrap();
        assert_eq!(read_packet(&mut stream).await, "RD#%");

        stream.write_all(b"CharsCheck#-1#%DONE#%").await.unwrap();
        drain(&mut stream).await;
    });

    let presenter = RecordingPresenter {
        selection: Some(ServerSelection {
            tab: ServerTab::Public,
            index: 0,
        }),
        ..RecordingPresenter::default()
    };
    let (commands, driver) = start_driver(master_port, presenter.clone());

    commands.send(ClientCommand::ConnectMaster).await.unwrap();
    assert!(
        presenter
            .wait_for(WAIT, |event| matches!(event, PresenterEvent::ServerListUpdated(_)))
            .await
    );
    let server = presenter
        .snapshot()
        .into_iter()
        .find_map(|event| match event {
            PresenterEvent::ServerListUpdated(list) => list.into_iter().next(),
            _ => None,
        })
        .unwrap();
    assert_eq!(server.port, game_port);

    commands.send(ClientCommand::ConnectGame(server)).await.unwrap();
    assert!(
        presenter
            .wait_for(WAIT, |event| *event == PresenterEvent::SessionReady)
            .await
    );

    commands.send(ClientCommand::Shutdown).await.unwrap();
    let machine = driver.await.unwrap();
    master.await.unwrap();
    game.await.unwrap();

    let session = machine.session();
    assert!(session.loaded);
    assert_eq!(session.phase, SessionPhase::SessionReady);
    assert_eq!(session.server_software, "loopback");
    assert!(session.features.fast_loading);
    assert!(!machine.lobby_active());

    let events = presenter.snapshot();
    assert!(events.contains(&PresenterEvent::WindowTitle(
        "Attorney Online 2: Loopback".to_string()
    )));
    assert!(events.contains(&PresenterEvent::SetCharacterTaken {
        index: 0,
        taken: true
    }));
}

#[tokio::test]
async fn test_unreachable_master_reports_error() {
    let closed = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = closed.local_addr().unwrap().port();
    drop(closed);

    let presenter = RecordingPresenter::default();
    let (commands, driver) = start_driver(port, presenter.clone());
    commands.send(ClientCommand::ConnectMaster).await.unwrap();

    assert!(
        presenter
            .wait_for(WAIT, |event| matches!(event, PresenterEvent::Error(_)))
            .await
    );
    drop(commands);
    driver.await.unwrap();
}

#[tokio::test]
async fn test_game_disconnect_returns_to_lobby() {
    let game_listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let game_port = game_listener.local_addr().unwrap().port();

    let game = tokio::spawn(async move {
        let (mut stream, _) = game_listener.accept().await.unwrap();
        stream.write_all(b"decryptor#NOENCRYPT#%").await.unwrap();
        assert!(read_packet(&mut stream).await.starts_with("HI#"));
        stream.write_all(b"SI#2#0#0#%").await.unwrap();
        assert_eq!(read_packet(&mut stream).await, "askchar2#%");
        // Dropping the stream closes the connection.
    });

    let presenter = RecordingPresenter::default();
    let (commands, driver) = start_driver(1, presenter.clone());
    commands
        .send(ClientCommand::ConnectGame(loopback(game_port)))
        .await
        .unwrap();

    assert!(
        presenter
            .wait_for(WAIT, |event| matches!(
                event,
                PresenterEvent::Notice(text) if text == "Disconnected from server."
            ))
            .await
    );
    game.await.unwrap();

    commands.send(ClientCommand::Shutdown).await.unwrap();
    let machine = driver.await.unwrap();
    assert!(machine.lobby_active());
    assert!(!machine.courtroom_active());
    assert_eq!(machine.session().phase, SessionPhase::Disconnected);
}

#[tokio::test]
async fn test_encrypted_headers_on_the_wire() {
    let game_listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let game_port = game_listener.local_addr().unwrap().port();

    let game = tokio::spawn(async move {
        let (mut stream, _) = game_listener.accept().await.unwrap();
        stream.write_all(b"decryptor#34#%").await.unwrap();
        read_packet(&mut stream).await
    });

    let presenter = RecordingPresenter::default();
    let (commands, driver) = start_driver(1, presenter);
    commands
        .send(ClientCommand::ConnectGame(loopback(game_port)))
        .await
        .unwrap();

    let hi = tokio::time::timeout(WAIT, game).await.unwrap().unwrap();
    let packet = gavel_net::Packet::decode(&hi);
    let revealed = gavel_net::reveal_header(&packet, 5).unwrap();
    assert_eq!(revealed.header, "HI");
    assert_ne!(packet.header, "HI");

    commands.send(ClientCommand::Shutdown).await.unwrap();
    driver.await.unwrap();
}

#[tokio::test]
async fn test_switching_servers_closes_loading_courtroom() {
    let game_listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let game_port = game_listener.local_addr().unwrap().port();

    let game = tokio::spawn(async move {
        let (mut stream, _) = game_listener.accept().await.unwrap();
        stream.write_all(b"decryptor#NOENCRYPT#%").await.unwrap();
        assert!(read_packet(&mut stream).await.starts_with("HI#"));
        stream.write_all(b"SI#2#0#0#%").await.unwrap();
        assert_eq!(read_packet(&mut stream).await, "askchar2#%");
        drain(&mut stream).await;
    });

    let presenter = RecordingPresenter::default();
    let (commands, driver) = start_driver(1, presenter.clone());
    commands
        .send(ClientCommand::ConnectGame(loopback(game_port)))
        .await
        .unwrap();
    assert!(
        presenter
            .wait_for(WAIT, |event| *event == PresenterEvent::ConstructCourtroom)
            .await
    );

    let unreachable = refused_port().await;
    commands
        .send(ClientCommand::ConnectGame(loopback(unreachable)))
        .await
        .unwrap();
    assert!(
        presenter
            .wait_for(WAIT, |event| matches!(
                event,
                PresenterEvent::Notice(text) if text.starts_with("Could not connect to server")
            ))
            .await
    );
    // The replaced link is closed, so the first server sees end-of-stream.
    tokio::time::timeout(WAIT, game).await.unwrap().unwrap();

    commands.send(ClientCommand::Shutdown).await.unwrap();
    let machine = driver.await.unwrap();
    assert!(!machine.courtroom_active());
    assert!(machine.lobby_active());
    assert_eq!(machine.session().phase, SessionPhase::Disconnected);
    assert!(presenter.contains(&PresenterEvent::DestructCourtroom));
    assert!(presenter.contains(&PresenterEvent::HideLoadingOverlay));
}

#[tokio::test]
async fn test_add_favorite_writes_server_list() {
    let master_listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let master_port = master_listener.local_addr().unwrap().port();

    let master = tokio::spawn(async move {
        let (mut stream, _) = master_listener.accept().await.unwrap();
        assert_eq!(read_packet(&mut stream).await, "ALL#%");
        stream
            .write_all(b"ALL#Court&First&10.0.0.1&27016#Hall&Second&10.0.0.2&27017#%")
            .await
            .unwrap();
        drain(&mut stream).await;
    });

    let dir = tempfile::tempdir().unwrap();
    let presenter = RecordingPresenter::default();
    let (commands, driver) = build_driver(master_port, presenter.clone());
    let driver = tokio::spawn(driver.with_favorites_dir(dir.path()).run());

    commands.send(ClientCommand::ConnectMaster).await.unwrap();
    assert!(
        presenter
            .wait_for(WAIT, |event| matches!(event, PresenterEvent::ServerListUpdated(_)))
            .await
    );
    commands.send(ClientCommand::AddFavorite(1)).await.unwrap();
    commands.send(ClientCommand::AddFavorite(7)).await.unwrap();
    commands.send(ClientCommand::Shutdown).await.unwrap();
    let machine = driver.await.unwrap();
    master.await.unwrap();

    assert_eq!(machine.favorites().len(), 1);
    let saved = gavel_config::load_favorites(dir.path()).unwrap();
    assert_eq!(saved, vec![FavoriteServerEntry {
        address: "10.0.0.2".to_string(),
        port: 27017,
        name: "Hall".to_string(),
    }]);
}
