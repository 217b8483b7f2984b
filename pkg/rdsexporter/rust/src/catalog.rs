// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

//! Static mapping from upstream statistic and payload field names to
//! published metric names.

use chrono::{DateTime, Utc};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Transform {
    Identity,
    /// The value is seconds since start; publish the start time as a Unix epoch.
    BootTime,
    Scale(f64),
}

impl Transform {
    pub fn apply(self, value: f64, now: DateTime<Utc>) -> f64 {
        match self {
            Transform::Identity => value,
            Transform::BootTime => (now.timestamp() - value.trunc() as i64) as f64,
            Transform::Scale(factor) => value * factor,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MetricDescriptor {
    pub source: &'static str,
    pub name: &'static str,
    pub help: &'static str,
    pub transform: Transform,
    /// Constant labels specific to this field, e.g. the CPU mode.
    pub labels: &'static [(&'static str, &'static str)],
}

impl MetricDescriptor {
    const fn new(source: &'static str, name: &'static str, help: &'static str) -> Self {
        Self {
            source,
            name,
            help,
            transform: Transform::Identity,
            labels: &[],
        }
    }

    const fn with_transform(mut self, transform: Transform) -> Self {
        self.transform = transform;
        self
    }

    const fn with_labels(mut self, labels: &'static [(&'static str, &'static str)]) -> Self {
        self.labels = labels;
        self
    }
}

/// Looks up `source` in `table`.
pub fn find(
    table: &'static [MetricDescriptor],
    source: &str,
) -> Option<&'static MetricDescriptor> {
    table.iter().find(|m| m.source == source)
}

const KB: Transform = Transform::Scale(1024.0);

const fn d(source: &'static str, name: &'static str, help: &'static str) -> MetricDescriptor {
    MetricDescriptor::new(source, name, help)
}

/// CloudWatch `AWS/RDS` statistics.
pub static BASIC_METRICS: &[MetricDescriptor] = &[
    d(
        "ActiveTransactions",
        "aws_rds_active_transactions_average",
        "The average number of current transactions executing on an Aurora database instance per second.",
    ),
    d(
        "AuroraBinlogReplicaLag",
        "aws_rds_aurora_binlog_replica_lag_average",
        "The amount of time a replica DB cluster running on Aurora with MySQL compatibility lags behind the source DB cluster. Units: Seconds",
    ),
    d(
        "AuroraReplicaLag",
        "aws_rds_aurora_replica_lag_average",
        "For an Aurora Replica, the amount of lag when replicating updates from the primary instance. Units: Milliseconds",
    ),
    d(
        "AuroraReplicaLagMaximum",
        "aws_rds_aurora_replica_lag_maximum_average",
        "The maximum amount of lag between the primary instance and each Aurora DB instance in the DB cluster. Units: Milliseconds",
    ),
    d(
        "AuroraReplicaLagMinimum",
        "aws_rds_aurora_replica_lag_minimum_average",
        "The minimum amount of lag between the primary instance and each Aurora DB instance in the DB cluster. Units: Milliseconds",
    ),
    d(
        "BinLogDiskUsage",
        "aws_rds_bin_log_disk_usage_average",
        "The amount of disk space occupied by binary logs on the master. Units: Bytes",
    ),
    d(
        "BlockedTransactions",
        "aws_rds_blocked_transactions_average",
        "The average number of transactions in the database that are blocked per second.",
    ),
    d(
        "BufferCacheHitRatio",
        "aws_rds_buffer_cache_hit_ratio_average",
        "The percentage of requests that are served by the buffer cache.",
    ),
    d(
        "BurstBalance",
        "aws_rds_burst_balance_average",
        "The percent of General Purpose SSD (gp2) burst-bucket I/O credits available. Units: Percent",
    ),
    d(
        "CommitLatency",
        "aws_rds_commit_latency_average",
        "The amount of latency for commit operations. Units: Milliseconds",
    ),
    d(
        "CommitThroughput",
        "aws_rds_commit_throughput_average",
        "The average number of commit operations per second.",
    ),
    d(
        "CPUCreditBalance",
        "aws_rds_cpu_credit_balance_average",
        "The number of earned CPU credits that an instance has accrued. Units: Credits (vCPU-minutes)",
    ),
    d(
        "CPUCreditUsage",
        "aws_rds_cpu_credit_usage_average",
        "The number of CPU credits spent by the instance for CPU utilization. Units: Credits (vCPU-minutes)",
    ),
    d(
        "CPUUtilization",
        "aws_rds_cpu_utilization_average",
        "The percentage of CPU utilization. Units: Percent",
    ),
    d(
        "DatabaseConnections",
        "aws_rds_database_connections_average",
        "The number of database connections in use. Units: Count",
    ),
    d(
        "DDLLatency",
        "aws_rds_ddl_latency_average",
        "The amount of latency for data definition language (DDL) requests. Units: Milliseconds",
    ),
    d(
        "DDLThroughput",
        "aws_rds_ddl_throughput_average",
        "The average number of DDL requests per second.",
    ),
    d(
        "Deadlocks",
        "aws_rds_deadlocks_average",
        "The average number of deadlocks in the database per second.",
    ),
    d(
        "DeleteLatency",
        "aws_rds_delete_latency_average",
        "The amount of latency for delete queries. Units: Milliseconds",
    ),
    d(
        "DeleteThroughput",
        "aws_rds_delete_throughput_average",
        "The average number of delete queries per second.",
    ),
    d(
        "DiskQueueDepth",
        "aws_rds_disk_queue_depth_average",
        "The number of outstanding IOs (read/write requests) waiting to access the disk. Units: Count",
    ),
    d(
        "DMLLatency",
        "aws_rds_dml_latency_average",
        "The amount of latency for inserts, updates, and deletes. Units: Milliseconds",
    ),
    d(
        "DMLThroughput",
        "aws_rds_dml_throughput_average",
        "The average number of inserts, updates, and deletes per second.",
    ),
    d(
        "EngineUptime",
        "rds_engine_boot_time_seconds",
        "Time when the database engine started, in seconds since the Unix epoch.",
    )
    .with_transform(Transform::BootTime),
    d(
        "FreeableMemory",
        "aws_rds_freeable_memory_average",
        "The amount of available random access memory. Units: Bytes",
    ),
    d(
        "FreeLocalStorage",
        "aws_rds_free_local_storage_average",
        "The amount of storage available for temporary tables and logs. Units: Bytes",
    ),
    d(
        "FreeStorageSpace",
        "aws_rds_free_storage_space_average",
        "The amount of available storage space. Units: Bytes",
    ),
    d(
        "InsertLatency",
        "aws_rds_insert_latency_average",
        "The amount of latency for insert queries. Units: Milliseconds",
    ),
    d(
        "InsertThroughput",
        "aws_rds_insert_throughput_average",
        "The average number of insert queries per second.",
    ),
    d(
        "LoginFailures",
        "aws_rds_login_failures_average",
        "The average number of failed login attempts per second.",
    ),
    d(
        "MaximumUsedTransactionIDs",
        "aws_rds_maximum_used_transaction_ids_average",
        "The maximum transaction ID that has been used. Applies to PostgreSQL.",
    ),
    d(
        "NetworkReceiveThroughput",
        "aws_rds_network_receive_throughput_average",
        "The incoming (Receive) network traffic on the DB instance. Units: Bytes/second",
    ),
    d(
        "NetworkThroughput",
        "aws_rds_network_throughput_average",
        "The amount of network throughput both received from and transmitted to clients. Units: Bytes/second",
    ),
    d(
        "NetworkTransmitThroughput",
        "aws_rds_network_transmit_throughput_average",
        "The outgoing (Transmit) network traffic on the DB instance. Units: Bytes/second",
    ),
    d(
        "OldestReplicationSlotLag",
        "aws_rds_oldest_replication_slot_lag_average",
        "The lagging size of the replica lagging the most in terms of WAL data received. Units: Megabytes",
    ),
    d(
        "Queries",
        "aws_rds_queries_average",
        "The average number of queries executed per second.",
    ),
    d(
        "ReadIOPS",
        "aws_rds_read_iops_average",
        "The average number of disk read I/O operations per second. Units: Count/Second",
    ),
    d(
        "ReadLatency",
        "aws_rds_read_latency_average",
        "The average amount of time taken per disk I/O operation. Units: Seconds",
    ),
    d(
        "ReadThroughput",
        "aws_rds_read_throughput_average",
        "The average number of bytes read from disk per second. Units: Bytes/Second",
    ),
    d(
        "ReplicaLag",
        "aws_rds_replica_lag_average",
        "The amount of time a Read Replica DB instance lags behind the source DB instance. Units: Seconds",
    ),
    d(
        "ReplicationSlotDiskUsage",
        "aws_rds_replication_slot_disk_usage_average",
        "The disk space used by replication slot files. Units: Megabytes",
    ),
    d(
        "ResultSetCacheHitRatio",
        "aws_rds_result_set_cache_hit_ratio_average",
        "The percentage of requests that are served by the Resultset cache.",
    ),
    d(
        "SelectLatency",
        "aws_rds_select_latency_average",
        "The amount of latency for select queries. Units: Milliseconds",
    ),
    d(
        "SelectThroughput",
        "aws_rds_select_throughput_average",
        "The average number of select queries per second.",
    ),
    d(
        "SwapUsage",
        "aws_rds_swap_usage_average",
        "The amount of swap space used on the DB instance. Units: Bytes",
    ),
    d(
        "TransactionLogsDiskUsage",
        "aws_rds_transaction_logs_disk_usage_average",
        "The disk space used by transaction logs. Units: Megabytes",
    ),
    d(
        "TransactionLogsGeneration",
        "aws_rds_transaction_logs_generation_average",
        "The size of transaction logs generated per second. Units: Megabytes/second",
    ),
    d(
        "UpdateLatency",
        "aws_rds_update_latency_average",
        "The amount of latency for update queries. Units: Milliseconds",
    ),
    d(
        "UpdateThroughput",
        "aws_rds_update_throughput_average",
        "The average number of update queries per second.",
    ),
    d(
        "VolumeBytesUsed",
        "aws_rds_volume_bytes_used_average",
        "The amount of storage used by your Aurora DB instance, in bytes.",
    ),
    d(
        "VolumeReadIOPs",
        "aws_rds_volume_read_io_ps_average",
        "The number of billed read I/O operations from a cluster volume, reported at 5-minute intervals.",
    ),
    d(
        "VolumeWriteIOPs",
        "aws_rds_volume_write_io_ps_average",
        "The number of write disk I/O operations to the cluster volume, reported at 5-minute intervals.",
    ),
    d(
        "WriteIOPS",
        "aws_rds_write_iops_average",
        "The average number of disk I/O operations per second. Units: Count/Second",
    ),
    d(
        "WriteLatency",
        "aws_rds_write_latency_average",
        "The average amount of time taken per disk I/O operation. Units: Seconds",
    ),
    d(
        "WriteThroughput",
        "aws_rds_write_throughput_average",
        "The average number of bytes written to disk per second. Units: Bytes/Second",
    ),
];

pub static GENERAL: &[MetricDescriptor] = &[
    d(
        "numVCPUs",
        "rdsosmetrics_General_numVCPUs",
        "The number of virtual CPUs for the DB instance.",
    ),
    d(
        "uptime",
        "node_boot_time_seconds",
        "Node boot time, in Unix time.",
    )
    .with_transform(Transform::BootTime),
];

const CPU_HELP: &str = "The percentage of CPU utilization.";

pub static CPU_UTILIZATION: &[MetricDescriptor] = &[
    d("guest", "node_cpu_average", CPU_HELP)
        .with_labels(&[("cpu", "All"), ("mode", "guest")]),
    d("idle", "node_cpu_average", CPU_HELP)
        .with_labels(&[("cpu", "All"), ("mode", "idle")]),
    d("irq", "node_cpu_average", CPU_HELP)
        .with_labels(&[("cpu", "All"), ("mode", "irq")]),
    d("nice", "node_cpu_average", CPU_HELP)
        .with_labels(&[("cpu", "All"), ("mode", "nice")]),
    d("steal", "node_cpu_average", CPU_HELP)
        .with_labels(&[("cpu", "All"), ("mode", "steal")]),
    d("system", "node_cpu_average", CPU_HELP)
        .with_labels(&[("cpu", "All"), ("mode", "system")]),
    d("user", "node_cpu_average", CPU_HELP)
        .with_labels(&[("cpu", "All"), ("mode", "user")]),
    d("wait", "node_cpu_average", CPU_HELP)
        .with_labels(&[("cpu", "All"), ("mode", "wait")]),
    d(
        "total",
        "rdsosmetrics_cpuUtilization_total",
        "The total percentage of the CPU in use. This value includes the nice value.",
    ),
];

pub static LOAD_AVERAGE_MINUTE: &[MetricDescriptor] = &[
    d(
        "one",
        "node_load1",
        "The number of processes requesting CPU time over the last minute.",
    ),
    d(
        "five",
        "node_load5",
        "The number of processes requesting CPU time over the last 5 minutes.",
    ),
    d(
        "fifteen",
        "node_load15",
        "The number of processes requesting CPU time over the last 15 minutes.",
    ),
];

pub static MEMORY: &[MetricDescriptor] = &[
    d(
        "active",
        "node_memory_Active_bytes",
        "The amount of assigned memory, in bytes.",
    )
    .with_transform(KB),
    d(
        "buffers",
        "node_memory_Buffers_bytes",
        "The amount of memory used for buffering I/O requests prior to writing to the storage device, in bytes.",
    )
    .with_transform(KB),
    d(
        "cached",
        "node_memory_Cached_bytes",
        "The amount of memory used for caching file system-based I/O, in bytes.",
    )
    .with_transform(KB),
    d(
        "dirty",
        "node_memory_Dirty_bytes",
        "The amount of memory pages in RAM that have been modified but not written to their related data block in storage, in bytes.",
    )
    .with_transform(KB),
    d(
        "free",
        "node_memory_MemFree_bytes",
        "The amount of unassigned memory, in bytes.",
    )
    .with_transform(KB),
    d(
        "hugePagesFree",
        "node_memory_HugePages_Free",
        "The number of free huge pages. Huge pages are a feature of the Linux kernel.",
    ),
    d(
        "hugePagesRsvd",
        "node_memory_HugePages_Rsvd",
        "The number of committed huge pages.",
    ),
    d(
        "hugePagesSize",
        "node_memory_Hugepagesize_bytes",
        "The size for each huge pages unit, in bytes.",
    )
    .with_transform(KB),
    d(
        "hugePagesSurp",
        "node_memory_HugePages_Surp",
        "The number of available surplus huge pages over the total.",
    ),
    d(
        "hugePagesTotal",
        "node_memory_HugePages_Total",
        "The total number of huge pages for the system.",
    ),
    d(
        "inactive",
        "node_memory_Inactive_bytes",
        "The amount of least-frequently used memory pages, in bytes.",
    )
    .with_transform(KB),
    d(
        "mapped",
        "node_memory_Mapped_bytes",
        "The total amount of file-system contents that is memory mapped inside a process address space, in bytes.",
    )
    .with_transform(KB),
    d(
        "pageTables",
        "node_memory_PageTables_bytes",
        "The amount of memory used by page tables, in bytes.",
    )
    .with_transform(KB),
    d(
        "slab",
        "node_memory_Slab_bytes",
        "The amount of reusable kernel data structures, in bytes.",
    )
    .with_transform(KB),
    d(
        "total",
        "node_memory_MemTotal_bytes",
        "The total amount of memory, in bytes.",
    )
    .with_transform(KB),
    d(
        "writeback",
        "node_memory_Writeback_bytes",
        "The amount of dirty pages in RAM that are still being written to the backing storage, in bytes.",
    )
    .with_transform(KB),
];

pub static TASKS: &[MetricDescriptor] = &[
    d(
        "blocked",
        "node_procs_blocked",
        "The number of tasks that are blocked.",
    ),
    d(
        "running",
        "node_procs_running",
        "The number of tasks that are running.",
    ),
    d(
        "sleeping",
        "rdsosmetrics_tasks_sleeping",
        "The number of tasks that are sleeping.",
    ),
    d(
        "stopped",
        "rdsosmetrics_tasks_stopped",
        "The number of tasks that are stopped.",
    ),
    d(
        "total",
        "rdsosmetrics_tasks_total",
        "The total number of tasks.",
    ),
    d(
        "zombie",
        "rdsosmetrics_tasks_zombie",
        "The number of child tasks that are inactive with an active parent task.",
    ),
];

pub static SWAP: &[MetricDescriptor] = &[
    d(
        "cached",
        "node_memory_SwapCached_bytes",
        "The amount of swap memory used as cache memory, in bytes.",
    )
    .with_transform(KB),
    d(
        "free",
        "node_memory_SwapFree_bytes",
        "The amount of swap memory free, in bytes.",
    )
    .with_transform(KB),
    d(
        "in",
        "rdsosmetrics_swap_in_bytes",
        "The amount of memory swapped in from disk, in bytes.",
    )
    .with_transform(KB),
    d(
        "out",
        "rdsosmetrics_swap_out_bytes",
        "The amount of memory swapped out to disk, in bytes.",
    )
    .with_transform(KB),
    d(
        "total",
        "node_memory_SwapTotal_bytes",
        "The total amount of swap memory available, in bytes.",
    )
    .with_transform(KB),
];

pub static NETWORK: &[MetricDescriptor] = &[
    d(
        "rx",
        "rdsosmetrics_network_rx",
        "The number of bytes received per second.",
    ),
    d(
        "tx",
        "rdsosmetrics_network_tx",
        "The number of bytes uploaded per second.",
    ),
];

pub static DISK_IO: &[MetricDescriptor] = &[
    d(
        "avgQueueLen",
        "rdsosmetrics_diskIO_avgQueueLen",
        "The number of requests waiting in the I/O device's queue.",
    ),
    d(
        "avgReqSz",
        "rdsosmetrics_diskIO_avgReqSz",
        "The average request size, in kilobytes.",
    ),
    d(
        "await",
        "rdsosmetrics_diskIO_await",
        "The number of milliseconds required to respond to requests, including queue time and service time.",
    ),
    d(
        "diskQueueDepth",
        "rdsosmetrics_diskIO_diskQueueDepth",
        "The number of outstanding IOs (read/write requests) waiting to access the disk.",
    ),
    d(
        "readIOsPS",
        "rdsosmetrics_diskIO_readIOsPS",
        "The number of read operations per second.",
    ),
    d(
        "readKb",
        "rdsosmetrics_diskIO_readKb",
        "The total number of kilobytes read.",
    ),
    d(
        "readKbPS",
        "rdsosmetrics_diskIO_readKbPS",
        "The number of kilobytes read per second.",
    ),
    d(
        "readLatency",
        "rdsosmetrics_diskIO_readLatency",
        "The elapsed time between the submission of a read I/O request and its completion, in milliseconds.",
    ),
    d(
        "readThroughput",
        "rdsosmetrics_diskIO_readThroughput",
        "The amount of network throughput used by requests to the DB cluster, in bytes per second.",
    ),
    d(
        "rrqmPS",
        "rdsosmetrics_diskIO_rrqmPS",
        "The number of merged read requests queued per second.",
    ),
    d(
        "tps",
        "rdsosmetrics_diskIO_tps",
        "The number of I/O transactions per second.",
    ),
    d(
        "util",
        "rdsosmetrics_diskIO_util",
        "The percentage of CPU time during which requests were issued.",
    ),
    d(
        "writeIOsPS",
        "rdsosmetrics_diskIO_writeIOsPS",
        "The number of write operations per second.",
    ),
    d(
        "writeKb",
        "rdsosmetrics_diskIO_writeKb",
        "The total number of kilobytes written.",
    ),
    d(
        "writeKbPS",
        "rdsosmetrics_diskIO_writeKbPS",
        "The number of kilobytes written per second.",
    ),
    d(
        "writeLatency",
        "rdsosmetrics_diskIO_writeLatency",
        "The average elapsed time between the submission of a write I/O request and its completion, in milliseconds.",
    ),
    d(
        "writeThroughput",
        "rdsosmetrics_diskIO_writeThroughput",
        "The amount of network throughput used by responses from the DB cluster, in bytes per second.",
    ),
    d(
        "wrqmPS",
        "rdsosmetrics_diskIO_wrqmPS",
        "The number of merged write requests queued per second.",
    ),
];

pub static FILE_SYS: &[MetricDescriptor] = &[
    d(
        "maxFiles",
        "node_filesystem_files",
        "The maximum number of files that can be created for the file system.",
    ),
    d(
        "total",
        "node_filesystem_size_bytes",
        "The total number of disk space available for the file system, in bytes.",
    )
    .with_transform(KB),
    d(
        "used",
        "rdsosmetrics_fileSys_used_bytes",
        "The amount of disk space used by files in the file system, in bytes.",
    )
    .with_transform(KB),
    d(
        "usedFilePercent",
        "rdsosmetrics_fileSys_usedFilePercent",
        "The percentage of available files in use.",
    ),
    d(
        "usedFiles",
        "rdsosmetrics_fileSys_usedFiles",
        "The number of files in the file system.",
    ),
    d(
        "usedPercent",
        "rdsosmetrics_fileSys_usedPercent",
        "The percentage of the file-system disk space in use.",
    ),
];
