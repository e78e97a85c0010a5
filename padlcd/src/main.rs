mod app;
mod config;

use crate::app::App;
use crate::config::Config;
use dotenv::{dotenv, var};
use log::{debug, info, warn};
use padlcd_gpio::GpioBias::PullUp;
use padlcd_gpio::GpioDriver;
use padlcd_gpio::gpiod::GpiodDriver;
use padlcd_gpio::keypad::GpioKeypad;
use padlcd_gpio::lcd::hd44780::driver::{GpioHD44780Driver, HD44780Driver};
use padlcd_gpio::tick::{Delay, KEYPAD_POLL_PERIOD, ThreadDelay, Ticker};
use std::time::Duration;

const DEFAULT_GPIO_CHIP: &str = "/dev/gpiochip0";

/// Time the LCD needs after power-on before it accepts the handshake.
const LCD_POWER_ON_WAIT: Duration = Duration::from_millis(15);

fn parse_pin_bus<const N: usize>(pin_str: &str) -> eyre::Result<[usize; N]> {
    pin_str
        .split([',', ' ', ';'])
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| s.parse())
        .collect::<Result<Vec<_>, _>>()?
        .try_into()
        .map_err(|pins: Vec<usize>| eyre::eyre!("Expected {} pins, got {}", N, pins.len()))
}

fn pin(name: &str) -> eyre::Result<usize> {
    var(name)
        .map_err(|err| eyre::eyre!("{}: {}", name, err))?
        .parse()
        .map_err(|err| eyre::eyre!("{}: {}", name, err))
}

fn pin_bus<const N: usize>(name: &str) -> eyre::Result<[usize; N]> {
    let pins = var(name).map_err(|err| eyre::eyre!("{}: {}", name, err))?;
    parse_pin_bus(&pins)
}

fn load_config() -> eyre::Result<Config> {
    debug!("Trying to load config...");
    Ok(match Config::try_load()? {
        Some(config) => {
            info!("Config loaded.");
            config
        }
        None => {
            info!("Config not found. Using default");
            let config = Config::default();
            config.save()?;
            info!("Default config saved.");
            config
        }
    })
}

fn main() -> eyre::Result<()> {
    // Initialize environment and logger
    let env_file = dotenv();
    pretty_env_logger::init();
    if let Err(err) = env_file {
        warn!("No .env file loaded: {}", err);
    }

    info!("padlcd starting...");

    let lcd_e_pin_no = pin("PADLCD_LCD_PIN_E")?;
    let lcd_rw_pin_no = pin("PADLCD_LCD_PIN_RW")?;
    let lcd_rs_pin_no = pin("PADLCD_LCD_PIN_RS")?;
    let lcd_data_pin_nos: [usize; 4] = pin_bus("PADLCD_LCD_PINS_DATA")?;

    let keypad_pin_col_nos: [usize; 3] = pin_bus("PADLCD_KEYPAD_PINS_COLS")?;
    let keypad_pin_row_nos: [usize; 4] = pin_bus("PADLCD_KEYPAD_PINS_ROWS")?;

    let chip = var("PADLCD_GPIO_CHIP").unwrap_or_else(|_| DEFAULT_GPIO_CHIP.to_string());

    info!(
        "LCD @ E: {}, RW: {}, RS: {}, Data: {:?}",
        lcd_e_pin_no, lcd_rw_pin_no, lcd_rs_pin_no, lcd_data_pin_nos
    );
    info!(
        "Keypad @ Cols: {:?}, Rows: {:?}",
        keypad_pin_col_nos, keypad_pin_row_nos
    );

    let config = load_config()?;
    debug!("{:?}", config);

    debug!("Initializing GPIO driver on {}...", chip);
    let gpio = GpiodDriver::open(&chip)?;
    debug!("{:?} initialized.", gpio);

    debug!("Initializing LCD driver...");
    let delay = ThreadDelay;
    let mut lcd_e_pin = gpio.get_pin(lcd_e_pin_no)?;
    let lcd_e_out = lcd_e_pin.as_output()?;
    let mut lcd_rw_pin = gpio.get_pin(lcd_rw_pin_no)?;
    let lcd_rw_out = lcd_rw_pin.as_output()?;
    let mut lcd_rs_pin = gpio.get_pin(lcd_rs_pin_no)?;
    let lcd_rs_out = lcd_rs_pin.as_output()?;
    let mut lcd_data_bus = gpio.get_pin_bus(lcd_data_pin_nos)?;
    let mut lcd = GpioHD44780Driver::new_4bit(
        &*lcd_e_out,
        Some(&*lcd_rw_out),
        &*lcd_rs_out,
        &mut *lcd_data_bus,
        &delay,
        config.settle(),
    );

    delay.delay(LCD_POWER_ON_WAIT);
    lcd.init(config.display_lines()?, config.font())?;
    debug!("{:?} initialized.", lcd);

    debug!("Initializing keypad driver...");
    let mut keypad_col_bus = gpio.get_pin_bus(keypad_pin_col_nos)?;
    let mut keypad_row_bus = gpio.get_pin_bus(keypad_pin_row_nos)?;
    keypad_row_bus.set_bias(PullUp)?;
    let keypad_col_out = keypad_col_bus.as_output()?;
    let keypad_row_in = keypad_row_bus.as_input()?;

    let keypad = GpioKeypad::new(&*keypad_col_out, &*keypad_row_in)?;
    debug!("{:?} initialized.", keypad);

    let mut app = App::new(config, &mut lcd, &keypad);
    app.start()?;

    info!("Starting main loop...");

    let (_ticker, ticks) = Ticker::every(KEYPAD_POLL_PERIOD)?;
    loop {
        ticks.wait()?;
        app.update()?;
    }
}
