use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::error::Result;

use super::models::{DecodedEvent, EventCounts, NotificationRecord, MAX_ARGS};

/// Spread arguments over the fixed slots. Anything past `MAX_ARGS` is dropped.
pub fn pack_args(args: &[String]) -> [Option<&str>; MAX_ARGS] {
    let mut slots = [None; MAX_ARGS];
    for (slot, arg) in slots.iter_mut().zip(args) {
        *slot = Some(arg.as_str());
    }
    slots
}

/// Inverse of [`pack_args`]. Slots are filled from index 0 without gaps, so
/// skipping nulls restores the original order.
pub fn unpack_args(slots: [Option<String>; MAX_ARGS]) -> Vec<String> {
    slots.into_iter().flatten().collect()
}

/// Store `event` unless a row with the same (network, transaction hash,
/// log index) exists. Returns whether a row was written.
pub fn insert_event(conn: &Connection, event: &DecodedEvent) -> Result<bool> {
    let args = pack_args(&event.arguments);
    let inserted = conn.execute(
        "INSERT OR IGNORE INTO events
         (network, contract_name, address, block_hash, block_number, transaction_hash,
          transaction_index, log_index, event_name,
          arg0, arg1, arg2, arg3, arg4, arg5, arg6, arg7, arg8, arg9)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9,
                 ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19)",
        params![
            event.network,
            event.contract_name,
            event.address,
            event.block_hash,
            event.block_number,
            event.transaction_hash,
            event.transaction_index,
            event.log_index,
            event.event_name,
            args[0],
            args[1],
            args[2],
            args[3],
            args[4],
            args[5],
            args[6],
            args[7],
            args[8],
            args[9],
        ],
    )?;
    Ok(inserted > 0)
}

pub fn get_event(
    conn: &Connection,
    network: &str,
    transaction_hash: &str,
    log_index: i64,
) -> Result<Option<DecodedEvent>> {
    let event = conn
        .query_row(
            "SELECT network, contract_name, address, block_hash, block_number, transaction_hash,
                    transaction_index, log_index, event_name,
                    arg0, arg1, arg2, arg3, arg4, arg5, arg6, arg7, arg8, arg9
             FROM events
             WHERE network = ?1 AND transaction_hash = ?2 AND log_index = ?3",
            params![network, transaction_hash, log_index],
            event_from_row,
        )
        .optional()?;
    Ok(event)
}

fn event_from_row(row: &Row<'_>) -> rusqlite::Result<DecodedEvent> {
    let mut slots: [Option<String>; MAX_ARGS] = Default::default();
    for (i, slot) in slots.iter_mut().enumerate() {
        *slot = row.get(9 + i)?;
    }

    Ok(DecodedEvent {
        network: row.get(0)?,
        contract_name: row.get(1)?,
        address: row.get(2)?,
        block_hash: row.get(3)?,
        block_number: row.get(4)?,
        transaction_hash: row.get(5)?,
        transaction_index: row.get(6)?,
        log_index: row.get(7)?,
        event_name: row.get(8)?,
        arguments: unpack_args(slots),
    })
}

pub fn notification_exists(conn: &Connection, record: &NotificationRecord) -> Result<bool> {
    let found = conn
        .query_row(
            "SELECT 1 FROM notifications
             WHERE network = ?1 AND transaction_hash = ?2 AND log_index = ?3 AND platform = ?4",
            params![
                record.network,
                record.transaction_hash,
                record.log_index,
                record.platform,
            ],
            |_| Ok(()),
        )
        .optional()?;
    Ok(found.is_some())
}

pub fn record_notification(conn: &Connection, record: &NotificationRecord) -> Result<()> {
    conn.execute(
        "INSERT OR IGNORE INTO notifications (network, transaction_hash, log_index, platform)
         VALUES (?1, ?2, ?3, ?4)",
        params![
            record.network,
            record.transaction_hash,
            record.log_index,
            record.platform,
        ],
    )?;
    Ok(())
}

/// Highest stored block for a contract, `None` when nothing is stored yet.
pub fn last_block(conn: &Connection, network: &str, address: &str) -> Result<Option<i64>> {
    let block = conn.query_row(
        "SELECT MAX(block_number) FROM events WHERE network = ?1 AND address = ?2",
        params![network, address],
        |row| row.get::<_, Option<i64>>(0),
    )?;
    Ok(block)
}

pub fn event_counts(conn: &Connection, network: &str) -> Result<EventCounts> {
    let events: i64 = conn.query_row(
        "SELECT COUNT(*) FROM events WHERE network = ?1",
        params![network],
        |row| row.get(0),
    )?;
    let notifications: i64 = conn.query_row(
        "SELECT COUNT(*) FROM notifications WHERE network = ?1",
        params![network],
        |row| row.get(0),
    )?;

    Ok(EventCounts {
        events,
        notifications,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::schema::run_migrations;

    fn memory_db() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        conn
    }

    fn event(tx: &str, log_index: i64, args: &[&str]) -> DecodedEvent {
        DecodedEvent {
            network: "mainnet".into(),
            contract_name: "Token".into(),
            address: "0x1111111111111111111111111111111111111111".into(),
            block_hash: "0xb10c".into(),
            block_number: 42,
            transaction_hash: tx.into(),
            transaction_index: 3,
            log_index,
            event_name: "Transfer".into(),
            arguments: args.iter().map(|a| a.to_string()).collect(),
        }
    }

    #[test]
    fn pack_then_unpack_round_trips() {
        let args = vec!["x".to_string(), "y".to_string()];
        let packed = pack_args(&args);
        assert_eq!(packed[0], Some("x"));
        assert_eq!(packed[1], Some("y"));
        assert!(packed[2..].iter().all(Option::is_none));

        let owned = packed.map(|slot| slot.map(str::to_string));
        assert_eq!(unpack_args(owned), args);
    }

    #[test]
    fn inserting_twice_stores_one_row() {
        let conn = memory_db();
        let e = event("0xaa", 0, &["a", "b"]);

        assert!(insert_event(&conn, &e).unwrap());
        assert!(!insert_event(&conn, &e).unwrap());

        let counts = event_counts(&conn, "mainnet").unwrap();
        assert_eq!(counts.events, 1);
    }

    #[test]
    fn identity_is_network_transaction_and_log_index() {
        let conn = memory_db();
        assert!(insert_event(&conn, &event("0xaa", 0, &[])).unwrap());
        assert!(insert_event(&conn, &event("0xaa", 1, &[])).unwrap());
        assert!(insert_event(&conn, &event("0xbb", 0, &[])).unwrap());

        let mut other_network = event("0xaa", 0, &[]);
        other_network.network = "sepolia".into();
        assert!(insert_event(&conn, &other_network).unwrap());

        // Same key, different payload: still a duplicate.
        let mut changed = event("0xaa", 0, &["changed"]);
        changed.block_number = 99;
        assert!(!insert_event(&conn, &changed).unwrap());

        assert_eq!(event_counts(&conn, "mainnet").unwrap().events, 3);
        let stored = get_event(&conn, "mainnet", "0xaa", 0).unwrap().unwrap();
        assert_eq!(stored.block_number, 42);
        assert!(stored.arguments.is_empty());
    }

    #[test]
    fn twelve_arguments_store_the_first_ten() {
        let conn = memory_db();
        let args: Vec<String> = (0..12).map(|i| format!("v{i}")).collect();
        let refs: Vec<&str> = args.iter().map(String::as_str).collect();
        let e = event("0xcc", 7, &refs);

        assert!(insert_event(&conn, &e).unwrap());

        let stored = get_event(&conn, "mainnet", "0xcc", 7).unwrap().unwrap();
        assert_eq!(stored.arguments, args[..10].to_vec());
        assert_eq!(stored.event_name, "Transfer");
        assert_eq!(stored.transaction_index, 3);
    }

    #[test]
    fn missing_event_is_none() {
        let conn = memory_db();
        assert!(get_event(&conn, "mainnet", "0xdead", 0).unwrap().is_none());
    }

    #[test]
    fn notifications_are_keyed_per_platform() {
        let conn = memory_db();
        let e = event("0xaa", 0, &[]);
        let telegram = NotificationRecord::for_event(&e, "telegram");
        let slack = NotificationRecord::for_event(&e, "slack");

        assert!(!notification_exists(&conn, &telegram).unwrap());
        record_notification(&conn, &telegram).unwrap();
        assert!(notification_exists(&conn, &telegram).unwrap());
        assert!(!notification_exists(&conn, &slack).unwrap());

        record_notification(&conn, &telegram).unwrap();
        assert_eq!(event_counts(&conn, "mainnet").unwrap().notifications, 1);
    }

    #[test]
    fn last_block_tracks_highest_stored_block() {
        let conn = memory_db();
        let address = "0x1111111111111111111111111111111111111111";
        assert_eq!(last_block(&conn, "mainnet", address).unwrap(), None);

        let mut early = event("0x01", 0, &[]);
        early.block_number = 10;
        let mut late = event("0x02", 0, &[]);
        late.block_number = 20;
        insert_event(&conn, &late).unwrap();
        insert_event(&conn, &early).unwrap();

        assert_eq!(last_block(&conn, "mainnet", address).unwrap(), Some(20));
        assert_eq!(last_block(&conn, "sepolia", address).unwrap(), None);
    }

    #[test]
    fn migrations_are_rerunnable() {
        let conn = memory_db();
        insert_event(&conn, &event("0xaa", 0, &["kept"])).unwrap();
        run_migrations(&conn).unwrap();
        assert_eq!(event_counts(&conn, "mainnet").unwrap().events, 1);
    }
}
