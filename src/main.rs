#![no_std]
#![no_main]

use defmt::info;
use defmt_rtt as _;
use embassy_executor::Spawner;
use embassy_stm32::gpio::{Input, Level, Output, Pull, Speed};
use embassy_stm32::usart::{Config, Uart};
use embassy_stm32::{bind_interrupts, peripherals, usart};
use embassy_sync::blocking_mutex::raw::ThreadModeRawMutex;
use embassy_sync::channel::Channel;
use embassy_time::{Instant, Ticker};
use panic_halt as _;

use lanesignal::ambient::NoAmbient;
use lanesignal::report::{Decision, Report};
use lanesignal::signal::{NUM_PINS, SignalHeads};
use lanesignal::uplink::ChannelUplink;
use lanesignal::{NodeConfig, Scheduler};

mod io;
use io::{UPLINK_DEPTH, Ultrasonic};

static REPORTS: Channel<ThreadModeRawMutex, Report, UPLINK_DEPTH> = Channel::new();
static DECISIONS: Channel<ThreadModeRawMutex, Decision, UPLINK_DEPTH> = Channel::new();

const CONFIG: NodeConfig = NodeConfig::DEFAULT;

// All signal LEDs are wired active-high.
const ACTIVE_LOWS: [bool; NUM_PINS] = [false; NUM_PINS];

#[embassy_executor::main]
async fn main(spawner: Spawner) {
    let p = embassy_stm32::init(Default::default());

    bind_interrupts!(struct Irqs {
        USART1 => usart::InterruptHandler<peripherals::USART1>;
    });
    let usart = Uart::new(
        p.USART1,
        p.PA10,
        p.PA9,
        Irqs,
        p.DMA1_CH4,
        p.DMA1_CH5,
        Config::default(), // 115200 baud
    )
    .unwrap();
    let (tx, rx) = usart.split();
    spawner
        .spawn(io::uplink_task(
            tx,
            rx,
            REPORTS.receiver(),
            DECISIONS.sender(),
        ))
        .unwrap();

    // Red, yellow, green per lane, in `signal::Pins` order.
    let mut lights: [Output<'static>; NUM_PINS] = [
        Output::new(p.PE1, Level::High, Speed::Low),
        Output::new(p.PB9, Level::Low, Speed::Low),
        Output::new(p.PB7, Level::Low, Speed::Low),
        Output::new(p.PB6, Level::High, Speed::Low),
        Output::new(p.PB8, Level::Low, Speed::Low),
        Output::new(p.PE0, Level::Low, Speed::Low),
        Output::new(p.PD8, Level::High, Speed::Low),
        Output::new(p.PD9, Level::Low, Speed::Low),
        Output::new(p.PD10, Level::Low, Speed::Low),
        Output::new(p.PD11, Level::High, Speed::Low),
        Output::new(p.PD12, Level::Low, Speed::Low),
        Output::new(p.PD13, Level::Low, Speed::Low),
    ];

    let sensors = Ultrasonic::new(
        [
            Output::new(p.PC0, Level::Low, Speed::Low),
            Output::new(p.PC2, Level::Low, Speed::Low),
            Output::new(p.PC4, Level::Low, Speed::Low),
            Output::new(p.PC6, Level::Low, Speed::Low),
        ],
        [
            Input::new(p.PC1, Pull::Down),
            Input::new(p.PC3, Pull::Down),
            Input::new(p.PC5, Pull::Down),
            Input::new(p.PC7, Pull::Down),
        ],
    );

    // the on-board LED is active-low; it toggles on every report
    let mut onboard_led = Output::new(p.PE12, Level::High, Speed::Low);

    let mut scheduler = Scheduler::new(
        &CONFIG,
        sensors,
        NoAmbient,
        ChannelUplink::new(REPORTS.sender(), DECISIONS.receiver()),
        SignalHeads::new(ACTIVE_LOWS),
    );
    info!("lane signal node up, all red");

    let mut ticker = Ticker::every(CONFIG.poll_interval);
    loop {
        let pass = scheduler.run_once(Instant::now());
        io::light(&mut lights, scheduler.signals().pin_levels());
        if pass.reported {
            onboard_led.toggle();
        }
        ticker.next().await;
    }
}
